/// Content store — the static dialogue table, its loading and validation.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::line::{LineEntry, LineOverride};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate line id in one file: {0}")]
    DuplicateId(String),
}

/// Severity of a [`ContentIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found by [`ContentStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIssue {
    pub severity: Severity,
    pub line_id: String,
    pub message: String,
}

/// All dialogue entries, keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentStore {
    pub primary_language: String,
    pub entries: FxHashMap<String, LineEntry>,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self {
            primary_language: "en".to_string(),
            entries: FxHashMap::default(),
        }
    }
}

// On disk the table is a list so authors can keep related lines together.
#[derive(Debug, Deserialize)]
struct RonContent {
    #[serde(default = "default_language")]
    primary_language: String,
    lines: Vec<LineEntry>,
}

fn default_language() -> String {
    "en".to_string()
}

impl ContentStore {
    pub fn new(primary_language: &str) -> Self {
        Self {
            primary_language: primary_language.to_string(),
            entries: FxHashMap::default(),
        }
    }

    /// Load a content store from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ContentStore, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a content store from a RON string.
    pub fn parse_ron(input: &str) -> Result<ContentStore, ContentError> {
        let raw: RonContent = ron::from_str(input)?;
        let mut entries = FxHashMap::default();
        for entry in raw.lines {
            if entries.contains_key(&entry.id) {
                return Err(ContentError::DuplicateId(entry.id));
            }
            entries.insert(entry.id.clone(), entry);
        }
        Ok(ContentStore {
            primary_language: raw.primary_language,
            entries,
        })
    }

    /// Merge another store into this one. Entries from `other` replace
    /// entries with the same id; the primary language is kept.
    pub fn merge(&mut self, other: ContentStore) {
        for (id, entry) in other.entries {
            self.entries.insert(id, entry);
        }
    }

    pub fn insert(&mut self, entry: LineEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&LineEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the table for dangling follow-ups, out-of-range awareness
    /// overrides, missing primary-language text and follow-up cycles.
    /// Issues are sorted by line id for stable reports.
    pub fn validate(&self) -> Vec<ContentIssue> {
        let mut issues = Vec::new();

        for (id, entry) in &self.entries {
            if entry.text.exact(&self.primary_language).map_or(true, str::is_empty) {
                issues.push(issue(
                    Severity::Error,
                    id,
                    format!("missing '{}' default text", self.primary_language),
                ));
            }

            for level in entry.awareness.keys() {
                if !(1..=4).contains(level) {
                    issues.push(issue(
                        Severity::Error,
                        id,
                        format!("awareness override for level {} (only 1-4 are used)", level),
                    ));
                }
            }

            let mut overrides: Vec<(String, &LineOverride)> = Vec::new();
            overrides.extend(entry.eras.iter().map(|(era, o)| (format!("era {}", era), o)));
            overrides.extend(entry.awareness.iter().map(|(lvl, o)| (format!("awareness {}", lvl), o)));
            if let Some(inner) = &entry.inner {
                overrides.push(("inner voice".to_string(), inner));
            }
            overrides.extend(
                entry
                    .variants
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (format!("variant {}", i), &v.then)),
            );

            for (tier, o) in &overrides {
                if o.text.is_empty() {
                    issues.push(issue(Severity::Warning, id, format!("{} override has no text", tier)));
                }
                if let Some(follow_up) = &o.follow_up {
                    if !self.contains(follow_up) {
                        issues.push(issue(
                            Severity::Error,
                            id,
                            format!("{} override follows up with unknown line '{}'", tier, follow_up),
                        ));
                    }
                }
            }

            if let Some(follow_up) = &entry.follow_up {
                if !self.contains(follow_up) {
                    issues.push(issue(
                        Severity::Error,
                        id,
                        format!("follows up with unknown line '{}'", follow_up),
                    ));
                }
            }
        }

        // Base follow-up chains must terminate or the scheduler never goes idle.
        for id in self.entries.keys() {
            let mut seen = FxHashSet::default();
            let mut current = id.as_str();
            while let Some(next) = self.entries.get(current).and_then(|e| e.follow_up.as_deref()) {
                if !seen.insert(current) {
                    break;
                }
                if next == id {
                    issues.push(issue(Severity::Error, id, "follow-up chain loops back to itself".to_string()));
                    break;
                }
                current = next;
            }
        }

        issues.sort_by(|a, b| a.line_id.cmp(&b.line_id).then(a.message.cmp(&b.message)));
        issues
    }
}

fn issue(severity: Severity, line_id: &str, message: String) -> ContentIssue {
    ContentIssue {
        severity,
        line_id: line_id.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::line::LocalizedText;

    const SMALL: &str = r#"(
        primary_language: "en",
        lines: [
            (id: "intro", text: {"en": "Welcome."}, follow_up: Some("intro_2")),
            (id: "intro_2", text: {"en": "Go left."}, delay: Some(1200)),
        ],
    )"#;

    #[test]
    fn parse_small_store() {
        let store = ContentStore::parse_ron(SMALL).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.primary_language, "en");
        assert_eq!(store.get("intro").unwrap().follow_up.as_deref(), Some("intro_2"));
        assert_eq!(store.get("intro_2").unwrap().delay, Some(1200));
        assert!(store.validate().is_empty());
    }

    #[test]
    fn duplicate_id_rejected() {
        let src = r#"(lines: [
            (id: "a", text: {"en": "One."}),
            (id: "a", text: {"en": "Two."}),
        ])"#;
        assert!(matches!(ContentStore::parse_ron(src), Err(ContentError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn merge_overrides_same_id() {
        let mut base = ContentStore::parse_ron(SMALL).unwrap();
        let mut patch = ContentStore::new("en");
        patch.insert(LineEntry::new("intro", LocalizedText::single("en", "Hello again.")));
        patch.insert(LineEntry::new("extra", LocalizedText::single("en", "New.")));
        base.merge(patch);

        assert_eq!(base.len(), 3);
        assert_eq!(base.get("intro").unwrap().text.exact("en"), Some("Hello again."));
        assert!(base.contains("intro_2"));
    }

    #[test]
    fn validate_reports_dangling_follow_up() {
        let mut store = ContentStore::new("en");
        let mut entry = LineEntry::new("a", LocalizedText::single("en", "A."));
        entry.follow_up = Some("missing".to_string());
        store.insert(entry);

        let issues = store.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("missing"));
    }

    #[test]
    fn validate_reports_bad_awareness_level_and_missing_text() {
        let mut store = ContentStore::new("en");
        let mut entry = LineEntry::new("a", LocalizedText::single("fr", "Bonjour."));
        entry.awareness.insert(5, LineOverride {
            text: LocalizedText::single("en", "Too late."),
            ..LineOverride::default()
        });
        store.insert(entry);

        let issues = store.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.message.contains("level 5")));
        assert!(issues.iter().any(|i| i.message.contains("default text")));
    }

    #[test]
    fn validate_reports_cycle() {
        let mut store = ContentStore::new("en");
        let mut a = LineEntry::new("a", LocalizedText::single("en", "A."));
        a.follow_up = Some("b".to_string());
        let mut b = LineEntry::new("b", LocalizedText::single("en", "B."));
        b.follow_up = Some("a".to_string());
        store.insert(a);
        store.insert(b);

        let issues = store.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.message.contains("loops")));
    }
}
