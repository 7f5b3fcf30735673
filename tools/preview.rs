/// Preview — interactive shell for stepping a narrator session by hand.
///
/// Usage: preview --content <path> [--config <file>] [--era <n>] [--lang <code>] [--seed <n>]
///
/// Commands:
///   say <id>               — resolve and speak a line
///   now <id>               — speak a line immediately, dropping the queue
///   tick <ms>              — advance simulated time
///   skip                   — finish the typing line or skip the wait
///   defy <instruction>     — record a defied instruction
///   comply <instruction>   — record a followed instruction
///   aware <points> <src>   — add awareness points
///   reveal                 — open the reveal gate and force the reveal
///   lang <code>            — switch language
///   room <name>            — move the player
///   play <secs>            — set total play time
///   era <n>                — restart the session in another era
///   clear | hide | reset   — tear down dialogue
///   show                   — print session state
///   help                   — list commands
///   quit                   — exit

use narrator_engine::core::config::NarratorConfig;
use narrator_engine::core::content::ContentStore;
use narrator_engine::core::scheduler::{LineState, SchedulerEvent};
use narrator_engine::schema::game_state::GameSnapshot;
use narrator_engine::NarratorSession;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut content_path = None;
    let mut config_path = None;
    let mut era: u32 = 1;
    let mut language = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--era" if i + 1 < args.len() => {
                i += 1;
                era = args[i].parse().unwrap_or(1);
            }
            "--lang" if i + 1 < args.len() => {
                i += 1;
                language = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(content_path) = content_path else {
        eprintln!("--content is required");
        print_usage();
        std::process::exit(1);
    };

    let content = match ContentStore::load_from_ron(Path::new(&content_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR loading content {}: {}", content_path, e);
            std::process::exit(1);
        }
    };
    let config = match config_path {
        Some(ref path) => match NarratorConfig::load_from_ron(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR loading config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => NarratorConfig::default(),
    };

    println!("Loaded {} lines", content.len());
    println!("Era: {}", era);
    println!("Type 'help' for commands.\n");

    let mut game = GameSnapshot::new();
    let mut session = match build_session(&content, &config, era, language.as_deref(), seed) {
        Some(s) => s,
        None => std::process::exit(1),
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "say" | "now" => {
                let Some(id) = parts.get(1) else {
                    println!("Usage: {} <line_id>", cmd);
                    continue;
                };
                session.notify_activity();
                let said = if cmd == "say" {
                    session.say(id, &game)
                } else {
                    session.say_immediate(id, &game)
                };
                if !said {
                    println!("Unknown line: {}", id);
                }
            }
            "tick" => {
                let ms = match parts.get(1).map(|s| s.parse::<u64>()) {
                    Some(Ok(ms)) => ms,
                    _ => {
                        println!("Usage: tick <ms>");
                        continue;
                    }
                };
                session.tick(ms, &game);
            }
            "skip" => {
                session.notify_activity();
                session.skip(&game);
            }
            "defy" | "comply" => {
                let Some(instruction) = parts.get(1) else {
                    println!("Usage: {} <instruction>", cmd);
                    continue;
                };
                let complied = cmd == "comply";
                let choice = parts.get(2).copied().unwrap_or(if complied { "followed" } else { "ignored" });
                session.record_decision(instruction, choice, complied);
                game.decisions.insert(instruction.to_string());
                let tracker = session.tracker();
                println!(
                    "Streaks: defiance {} compliance {} (rate {:.2})",
                    tracker.defiance_streak(),
                    tracker.compliance_streak(),
                    tracker.compliance_rate()
                );
            }
            "aware" => {
                let points = match parts.get(1).map(|s| s.parse::<u32>()) {
                    Some(Ok(p)) => p,
                    _ => {
                        println!("Usage: aware <points> [source]");
                        continue;
                    }
                };
                let source = parts.get(2).copied().unwrap_or("manual");
                for level in session.add_awareness(points, source, &game) {
                    println!("Awareness now {:?}", level);
                }
            }
            "reveal" => {
                session.open_reveal_gate();
                if session.force_full_reveal(&game) {
                    println!("Disguise broken.");
                } else {
                    println!("Reveal had no effect in era {} at {:?}", session.era(), session.level());
                }
            }
            "lang" => {
                let Some(code) = parts.get(1) else {
                    println!("Current language: {}", session.language());
                    continue;
                };
                session.set_language(code, &game);
            }
            "room" => {
                let Some(room) = parts.get(1) else {
                    println!("Usage: room <name>");
                    continue;
                };
                game.enter(room);
                session.notify_activity();
            }
            "play" => {
                match parts.get(1).map(|s| s.parse::<u64>()) {
                    Some(Ok(secs)) => game.play_seconds = secs,
                    _ => println!("Usage: play <seconds>"),
                }
            }
            "era" => {
                let next = match parts.get(1).map(|s| s.parse::<u32>()) {
                    Some(Ok(n)) => n,
                    _ => {
                        println!("Current era: {}", session.era());
                        continue;
                    }
                };
                if let Some(s) = build_session(&content, &config, next, Some(session.language()), seed) {
                    session = s;
                    println!("Restarted in era {}", next);
                }
            }
            "clear" => session.clear(),
            "hide" => session.hide(),
            "reset" => session.reset(),
            "show" => {
                print_state(&session);
                continue;
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
                continue;
            }
        }

        print_events(&mut session);
        print_lines(&session);
    }
}

fn print_usage() {
    println!("Preview — interactive shell for stepping a narrator session by hand.");
    println!();
    println!("Usage: preview --content <path> [--config <file>] [--era <n>] [--lang <code>] [--seed <n>]");
    println!();
    println!("  --content <path>   Path to a content RON file");
    println!("  --config <file>    Narrator tuning file (optional)");
    println!("  --era <n>          Era to start in (default: 1)");
    println!("  --lang <code>      Display language (default: content's primary)");
    println!("  --seed <n>         Seed for idle line selection (default: 42)");
}

fn print_help() {
    println!("Commands:");
    println!("  say <id>              Resolve and speak a line");
    println!("  now <id>              Speak a line immediately, dropping the queue");
    println!("  tick <ms>             Advance simulated time");
    println!("  skip                  Finish the typing line or skip the wait");
    println!("  defy <instr> [choice] Record a defied instruction");
    println!("  comply <instr>        Record a followed instruction");
    println!("  aware <n> [source]    Add awareness points");
    println!("  reveal                Open the reveal gate and force the reveal");
    println!("  lang <code>           Switch language");
    println!("  room <name>           Move the player");
    println!("  play <secs>           Set total play time");
    println!("  era <n>               Restart the session in another era");
    println!("  clear | hide | reset  Tear down dialogue");
    println!("  show                  Print session state");
    println!("  help                  Show this help");
    println!("  quit                  Exit");
}

fn build_session(
    content: &ContentStore,
    config: &NarratorConfig,
    era: u32,
    language: Option<&str>,
    seed: u64,
) -> Option<NarratorSession> {
    let mut builder = NarratorSession::builder()
        .era(era)
        .seed(seed)
        .with_content(content.clone())
        .with_config(config.clone());
    if let Some(language) = language {
        builder = builder.language(language);
    }
    match builder.build() {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("ERROR building session: {}", e);
            None
        }
    }
}

fn print_events(session: &mut NarratorSession) {
    for event in session.drain_events() {
        match event {
            SchedulerEvent::LineStarted { id, .. } => println!("  + {}", id),
            SchedulerEvent::LineInterrupted { id, .. } => println!("  ! {} (interrupted)", id),
            SchedulerEvent::ModeChanged { mode } => println!("  ~ mode {:?}", mode),
            SchedulerEvent::Idle => println!("  ~ idle"),
            _ => {}
        }
    }
}

fn print_lines(session: &NarratorSession) {
    let lines = session.visible_lines();
    if lines.is_empty() {
        return;
    }
    println!("\n--- Visible ---");
    for line in lines {
        let marker = match line.state {
            LineState::Typing => ">",
            LineState::Displayed if line.dimmed => "-",
            LineState::Displayed => " ",
            LineState::Fading => ".",
        };
        println!("{} [{}] {} ({})", marker, line.mood.as_str(), line.text, line.id);
    }
    println!("--- End ---\n");
}

fn print_state(session: &NarratorSession) {
    let tracker = session.tracker();
    println!("Era:        {}", session.era());
    println!("Language:   {}", session.language());
    println!("Awareness:  {:?} ({} points)", session.level(), session.points());
    println!("Mode:       {:?}", session.mode());
    println!("Revealed:   {}", session.memory().is_revealed());
    println!(
        "Decisions:  {} ({} defied, streak {}, max streak {})",
        tracker.total_decisions(),
        tracker.total_defiance(),
        tracker.defiance_streak(),
        tracker.max_defiance_streak()
    );
    println!("Queued:     {:?}", session.scheduler().queued_ids());
    for grant in session.awareness_log() {
        println!("  +{} from {} (total {})", grant.points, grant.source, grant.running_total);
    }
    print_lines(session);
}
