use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::condition::Variant;

/// Key into the content store.
pub type LineId = String;

/// The emotional register a line is delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Neutral,
    Amused,
    Pleased,
    Curious,
    Irritated,
    Concerned,
    Cold,
    Warm,
    Unsettled,
    Glitch,
}

impl Mood {
    /// Returns the presentation tag for this mood (e.g., "irritated").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Amused => "amused",
            Self::Pleased => "pleased",
            Self::Curious => "curious",
            Self::Irritated => "irritated",
            Self::Concerned => "concerned",
            Self::Cold => "cold",
            Self::Warm => "warm",
            Self::Unsettled => "unsettled",
            Self::Glitch => "glitch",
        }
    }
}

/// Text keyed by language code.
///
/// Backed by a `BTreeMap` so that the last-resort fallback (first language
/// in key order) is the same on every run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(pub BTreeMap<String, String>);

impl LocalizedText {
    /// Convenience constructor for single-language text.
    pub fn single(language: &str, text: &str) -> Self {
        Self(BTreeMap::from([(language.to_string(), text.to_string())]))
    }

    pub fn with(mut self, language: &str, text: &str) -> Self {
        self.0.insert(language.to_string(), text.to_string());
        self
    }

    /// Exact lookup, no fallback.
    pub fn exact(&self, language: &str) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }

    /// Look up text for `language`, falling back to `primary`, then to the
    /// first language present. Never panics; yields `""` only when the map
    /// is empty.
    pub fn get(&self, language: &str, primary: &str) -> &str {
        if let Some(text) = self.exact(language) {
            return text;
        }
        if let Some(text) = self.exact(primary) {
            tracing::debug!(language, primary, "missing language variant, using primary");
            return text;
        }
        self.0.values().next().map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Replacement payload carried by every override tier. Fields left `None`
/// fall back to the owning entry's base values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineOverride {
    pub text: LocalizedText,
    #[serde(default)]
    pub mood: Option<Mood>,
    #[serde(default)]
    pub follow_up: Option<LineId>,
    #[serde(default)]
    pub delay: Option<u64>,
}

/// A static dialogue entry in the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineEntry {
    pub id: LineId,
    pub text: LocalizedText,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub follow_up: Option<LineId>,
    /// Milliseconds to wait before this line is typed. `0` (the default)
    /// marks an event-triggered line that interrupts whatever is playing.
    #[serde(default)]
    pub delay: Option<u64>,
    /// Per-era replacements, keyed by era number.
    #[serde(default)]
    pub eras: BTreeMap<u32, LineOverride>,
    /// Per-awareness-level replacements (levels 1..=4, baseline era only).
    #[serde(default)]
    pub awareness: BTreeMap<u8, LineOverride>,
    /// Text presented as the player's own thoughts (baseline era only).
    #[serde(default)]
    pub inner: Option<LineOverride>,
    /// Conditional variants in declaration order. Resolution walks them
    /// back to front.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl LineEntry {
    /// A bare entry with only default text, mainly for tests and tools.
    pub fn new(id: &str, text: LocalizedText) -> Self {
        Self {
            id: id.to_string(),
            text,
            mood: Mood::Neutral,
            follow_up: None,
            delay: None,
            eras: BTreeMap::new(),
            awareness: BTreeMap::new(),
            inner: None,
            variants: Vec::new(),
        }
    }
}

/// The outcome of resolving a line id against the current state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedLine {
    pub id: LineId,
    pub text: String,
    pub mood: Mood,
    pub follow_up: Option<LineId>,
    pub delay_ms: u64,
}

impl ResolvedLine {
    /// Build a resolved line directly, bypassing the content store.
    pub fn new(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            mood: Mood::Neutral,
            follow_up: None,
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_follow_up(mut self, follow_up: &str) -> Self {
        self.follow_up = Some(follow_up.to_string());
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = mood;
        self
    }

    /// Length in characters, the unit the typewriter reveals.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localized_exact_language() {
        let text = LocalizedText::single("en", "Go left.").with("fr", "Allez à gauche.");
        assert_eq!(text.get("fr", "en"), "Allez à gauche.");
        assert_eq!(text.get("en", "en"), "Go left.");
    }

    #[test]
    fn localized_falls_back_to_primary() {
        let text = LocalizedText::single("en", "Go left.").with("de", "Geh nach links.");
        assert_eq!(text.get("ja", "en"), "Go left.");
    }

    #[test]
    fn localized_falls_back_to_first_key_without_primary() {
        let text = LocalizedText::single("fr", "Allez.").with("de", "Geh.");
        // "de" sorts before "fr"
        assert_eq!(text.get("ja", "en"), "Geh.");
    }

    #[test]
    fn localized_empty_yields_empty_string() {
        let text = LocalizedText::default();
        assert_eq!(text.get("en", "en"), "");
        assert!(text.is_empty());
    }

    #[test]
    fn mood_strings() {
        assert_eq!(Mood::Irritated.as_str(), "irritated");
        assert_eq!(Mood::default(), Mood::Neutral);
    }

    #[test]
    fn entry_ron_defaults() {
        let src = r#"(id: "door", text: {"en": "Take the door on the left."})"#;
        let entry: LineEntry = ron::from_str(src).unwrap();
        assert_eq!(entry.id, "door");
        assert_eq!(entry.mood, Mood::Neutral);
        assert!(entry.follow_up.is_none());
        assert!(entry.variants.is_empty());
        assert!(entry.awareness.is_empty());
    }

    #[test]
    fn resolved_char_len_counts_chars() {
        let line = ResolvedLine::new("x", "héllo");
        assert_eq!(line.char_len(), 5);
    }
}
