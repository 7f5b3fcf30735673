/// Content loading tests — RON tables, merging and validation.

use narrator_engine::core::content::{ContentError, ContentStore, Severity};
use std::path::Path;

#[test]
fn demo_content_loads_and_validates_clean() {
    let store = ContentStore::load_from_ron(Path::new("content/narrator.ron")).unwrap();
    assert_eq!(store.primary_language, "en");
    assert!(store.contains("intro"));
    for level in 1..=5 {
        assert!(store.contains(&format!("awareness_{}", level)));
    }
    let issues = store.validate();
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn fixture_overrides_parse() {
    let store = ContentStore::load_from_ron(Path::new("tests/fixtures/lines.ron")).unwrap();
    let door = store.get("door").unwrap();
    assert_eq!(door.eras.len(), 1);
    assert_eq!(door.awareness.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert!(door.inner.is_some());
    assert_eq!(door.variants.len(), 2);
    assert_eq!(store.get("chain_b").unwrap().delay, Some(200));
}

#[test]
fn broken_fixture_reports_every_problem() {
    let store = ContentStore::load_from_ron(Path::new("tests/fixtures/broken_lines.ron")).unwrap();
    let issues = store.validate();
    let flagged: Vec<&str> = issues.iter().map(|i| i.line_id.as_str()).collect();

    assert!(flagged.contains(&"loop_a"));
    assert!(flagged.contains(&"loop_b"));
    assert!(flagged.contains(&"dangling"));
    assert!(flagged.contains(&"french_only"));
    assert!(flagged.contains(&"bad_level"));
    assert!(issues.iter().all(|i| i.severity == Severity::Error));

    // Sorted by line id.
    let mut sorted = flagged.clone();
    sorted.sort();
    assert_eq!(flagged, sorted);
}

#[test]
fn duplicate_ids_in_one_file_rejected() {
    let src = r#"(lines: [
        (id: "a", text: {"en": "One."}),
        (id: "a", text: {"en": "Two."}),
    ])"#;
    match ContentStore::parse_ron(src) {
        Err(ContentError::DuplicateId(id)) => assert_eq!(id, "a"),
        other => panic!("expected duplicate id error, got {:?}", other),
    }
}

#[test]
fn merge_lets_later_files_override() {
    let mut base = ContentStore::load_from_ron(Path::new("tests/fixtures/lines.ron")).unwrap();
    let patch = ContentStore::parse_ron(
        r#"(primary_language: "de", lines: [
            (id: "door", text: {"en": "A red door."}),
            (id: "extra", text: {"en": "New line."}),
        ])"#,
    )
    .unwrap();
    let before = base.len();
    base.merge(patch);

    assert_eq!(base.len(), before + 1);
    assert_eq!(base.primary_language, "en");
    let door = base.get("door").unwrap();
    assert_eq!(door.text.exact("en"), Some("A red door."));
    assert!(door.variants.is_empty());
}

#[test]
fn missing_file_is_io_error() {
    let result = ContentStore::load_from_ron(Path::new("tests/fixtures/nope.ron"));
    assert!(matches!(result, Err(ContentError::Io(_))));
}
