/// Content Linter — validates narrator dialogue tables and tuning files.
///
/// Usage: content_linter <content_path> [--config <file>] [--strict]

use narrator_engine::core::config::NarratorConfig;
use narrator_engine::core::content::{ContentStore, Severity};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: content_linter <content_path> [--config <file>] [--strict]");
        process::exit(0);
    }

    let content_path = &args[1];
    let mut config_path = None;
    let mut strict = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--strict" => strict = true,
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    // Load every content file; later files override earlier ones
    let mut store: Option<ContentStore> = None;
    let path = Path::new(content_path);

    if path.is_file() {
        match ContentStore::load_from_ron(path) {
            Ok(loaded) => store = Some(loaded),
            Err(e) => {
                eprintln!("ERROR: Failed to load content file: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        load_content_recursive(path, &mut store);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", content_path);
        process::exit(1);
    }

    let Some(store) = store else {
        eprintln!("ERROR: No content files found under '{}'", content_path);
        process::exit(1);
    };

    println!("Loaded {} lines (primary language '{}')", store.len(), store.primary_language);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for issue in store.validate() {
        let message = format!("Line '{}': {}", issue.line_id, issue.message);
        match issue.severity {
            Severity::Error => errors.push(message),
            Severity::Warning => warnings.push(message),
        }
    }

    if let Some(ref config_path) = config_path {
        match NarratorConfig::load_from_ron(Path::new(config_path)) {
            Ok(config) => lint_config(&config, &store, &mut errors, &mut warnings),
            Err(e) => errors.push(format!("Config '{}': {}", config_path, e)),
        }
    }

    // Print report
    println!("\n=== Content Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() && !(strict && !warnings.is_empty()) {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_content_recursive(dir: &Path, store: &mut Option<ContentStore>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            load_content_recursive(&path, store);
        } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            match ContentStore::load_from_ron(&path) {
                Ok(loaded) => {
                    println!("  Loaded: {}", path.display());
                    match store.as_mut() {
                        Some(existing) => existing.merge(loaded),
                        None => *store = Some(loaded),
                    }
                }
                Err(e) => {
                    eprintln!("  ERROR loading {}: {}", path.display(), e);
                }
            }
        }
    }
}

fn lint_config(
    config: &NarratorConfig,
    store: &ContentStore,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    for id in &config.idle.pool {
        if !store.contains(id) {
            errors.push(format!("Idle pool references unknown line '{}'", id));
        }
    }
    if config.idle.timeout_ms.is_some() && config.idle.pool.is_empty() {
        warnings.push("Idle timeout is set but the idle pool is empty".to_string());
    }
    if config.idle.pool.len() == 1 {
        warnings.push("Idle pool has a single line; it will repeat every time".to_string());
    }

    // Every level the narrator can reach should announce itself
    let top = config.awareness.baseline_cap.max(config.awareness.later_era_cap);
    for level in 1..=top {
        let id = format!("awareness_{}", level);
        if !store.contains(&id) {
            warnings.push(format!("No transition line '{}' for awareness level {}", id, level));
        }
    }
}
