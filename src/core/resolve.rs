/// Line resolution — picks the text, mood and chaining for a line id from
/// the current era, awareness level, decision history and game state.
///
/// Resolution is a pure function of its inputs: the same id and context
/// always produce the same [`ResolvedLine`].
use crate::core::awareness::{is_baseline, AwarenessLevel};
use crate::core::content::ContentStore;
use crate::core::tracker::DecisionTracker;
use crate::schema::condition::Condition;
use crate::schema::game_state::GameStateQuery;
use crate::schema::line::{LineEntry, LineOverride, ResolvedLine};

/// Everything resolution depends on besides the content itself.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub language: &'a str,
    pub era: u32,
    pub awareness: AwarenessLevel,
    pub tracker: &'a DecisionTracker,
    pub game: &'a dyn GameStateQuery,
}

/// Which tier of an entry produced the resolved text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Era(u32),
    Awareness(u8),
    Inner,
    Variant(usize),
    Default,
}

/// Resolve `line_id`, or `None` if the store has no such line. An unknown
/// id means "say nothing".
pub fn resolve(store: &ContentStore, line_id: &str, ctx: &ResolveContext<'_>) -> Option<ResolvedLine> {
    resolve_with_tier(store, line_id, ctx).map(|(line, _)| line)
}

/// [`resolve`], also reporting which tier matched.
pub fn resolve_with_tier(
    store: &ContentStore,
    line_id: &str,
    ctx: &ResolveContext<'_>,
) -> Option<(ResolvedLine, Tier)> {
    let Some(entry) = store.get(line_id) else {
        tracing::debug!(line_id, "unknown line id, saying nothing");
        return None;
    };

    let (tier, chosen) = select_tier(entry, ctx);
    let primary = store.primary_language.as_str();

    let line = match chosen {
        Some(o) => ResolvedLine {
            id: entry.id.clone(),
            text: o.text.get(ctx.language, primary).to_string(),
            mood: o.mood.unwrap_or(entry.mood),
            follow_up: o.follow_up.clone().or_else(|| entry.follow_up.clone()),
            delay_ms: o.delay.or(entry.delay).unwrap_or(0),
        },
        None => ResolvedLine {
            id: entry.id.clone(),
            text: entry.text.get(ctx.language, primary).to_string(),
            mood: entry.mood,
            follow_up: entry.follow_up.clone(),
            delay_ms: entry.delay.unwrap_or(0),
        },
    };
    Some((line, tier))
}

fn select_tier<'e>(entry: &'e LineEntry, ctx: &ResolveContext<'_>) -> (Tier, Option<&'e LineOverride>) {
    if let Some(o) = entry.eras.get(&ctx.era) {
        return (Tier::Era(ctx.era), Some(o));
    }

    let baseline = is_baseline(ctx.era);

    if baseline {
        // Walk down from the current level; a level without its own text
        // inherits the nearest lower one.
        let top = ctx.awareness.as_u8().min(4);
        for level in (1..=top).rev() {
            if let Some(o) = entry.awareness.get(&level) {
                return (Tier::Awareness(level), Some(o));
            }
        }

        if let Some(o) = &entry.inner {
            return (Tier::Inner, Some(o));
        }
    }

    // Most specific variants are declared last.
    for (index, variant) in entry.variants.iter().enumerate().rev() {
        if variant.when.evaluate(ctx.tracker, ctx.game) {
            return (Tier::Variant(index), Some(&variant.then));
        }
    }

    (Tier::Default, None)
}

impl Condition {
    /// Evaluate against decision history and game state. Pure.
    pub fn evaluate(&self, tracker: &DecisionTracker, game: &dyn GameStateQuery) -> bool {
        match self {
            Self::DefianceStreakAtLeast(n) => tracker.defiance_streak() >= *n,
            Self::ComplianceStreakAtLeast(n) => tracker.compliance_streak() >= *n,
            Self::MaxDefianceStreakAtLeast(n) => tracker.max_defiance_streak() >= *n,
            Self::TotalDefianceAtLeast(n) => tracker.total_defiance() >= *n,
            Self::TotalComplianceAtLeast(n) => tracker.total_compliance() >= *n,
            Self::ComplianceRateBelow(rate) => tracker.compliance_rate() < *rate,
            Self::ComplianceRateAtLeast(rate) => tracker.compliance_rate() >= *rate,
            Self::Explored(area) => tracker.has_explored(area),
            Self::PuzzleSolved(puzzle) => {
                tracker.has_solved(puzzle) || game.puzzle_completed(puzzle)
            }
            Self::LoreFound(lore) => tracker.has_found_lore(lore),
            Self::Visited(room) => game.has_visited(room),
            Self::InRoom(room) => game.current_room() == Some(room.as_str()),
            Self::DecisionMade(decision) => game.decision_made(decision),
            Self::PlaySecondsAtLeast(secs) => game.play_seconds() >= *secs,
            Self::All(conditions) => conditions.iter().all(|c| c.evaluate(tracker, game)),
            Self::Any(conditions) => conditions.iter().any(|c| c.evaluate(tracker, game)),
            Self::Not(condition) => !condition.evaluate(tracker, game),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::condition::Variant;
    use crate::schema::decision::DecisionRecord;
    use crate::schema::game_state::GameSnapshot;
    use crate::schema::line::{LocalizedText, Mood};

    fn text(s: &str) -> LocalizedText {
        LocalizedText::single("en", s)
    }

    fn over(s: &str) -> LineOverride {
        LineOverride {
            text: text(s),
            ..LineOverride::default()
        }
    }

    fn layered_entry() -> LineEntry {
        let mut entry = LineEntry::new("door", text("Take the left door."));
        entry.mood = Mood::Neutral;
        entry.eras.insert(2, over("Left again. You know the drill."));
        entry.awareness.insert(2, LineOverride {
            mood: Some(Mood::Concerned),
            ..over("The left door. Probably.")
        });
        entry.inner = Some(over("I should take the left door."));
        entry.variants.push(Variant {
            when: Condition::DefianceStreakAtLeast(1),
            then: over("Left. Please."),
        });
        entry
    }

    fn store_with(entry: LineEntry) -> ContentStore {
        let mut store = ContentStore::new("en");
        store.insert(entry);
        store
    }

    fn defiant_tracker(n: u32) -> DecisionTracker {
        let mut tracker = DecisionTracker::new();
        for i in 0..n {
            tracker.record(DecisionRecord::new("left", "right", false, i as u64));
        }
        tracker
    }

    fn ctx<'a>(
        era: u32,
        awareness: AwarenessLevel,
        tracker: &'a DecisionTracker,
        game: &'a GameSnapshot,
    ) -> ResolveContext<'a> {
        ResolveContext {
            language: "en",
            era,
            awareness,
            tracker,
            game,
        }
    }

    #[test]
    fn unknown_id_is_none() {
        let store = ContentStore::new("en");
        let tracker = DecisionTracker::new();
        let game = GameSnapshot::new();
        assert!(resolve(&store, "nope", &ctx(1, AwarenessLevel::Dormant, &tracker, &game)).is_none());
    }

    #[test]
    fn awareness_beats_inner_and_variant() {
        let store = store_with(layered_entry());
        let tracker = defiant_tracker(1);
        let game = GameSnapshot::new();
        let (line, tier) =
            resolve_with_tier(&store, "door", &ctx(1, AwarenessLevel::Uneasy, &tracker, &game)).unwrap();
        assert_eq!(tier, Tier::Awareness(2));
        assert_eq!(line.text, "The left door. Probably.");
        assert_eq!(line.mood, Mood::Concerned);
    }

    #[test]
    fn era_override_wins_outright() {
        let store = store_with(layered_entry());
        let tracker = defiant_tracker(1);
        let game = GameSnapshot::new();
        let line = resolve(&store, "door", &ctx(2, AwarenessLevel::Uneasy, &tracker, &game)).unwrap();
        assert_eq!(line.text, "Left again. You know the drill.");
    }

    #[test]
    fn awareness_walks_down_to_nearest_level() {
        let store = store_with(layered_entry());
        let tracker = DecisionTracker::new();
        let game = GameSnapshot::new();
        let (_, tier) =
            resolve_with_tier(&store, "door", &ctx(1, AwarenessLevel::Cracking, &tracker, &game)).unwrap();
        assert_eq!(tier, Tier::Awareness(2));
        // Level 1 has no override of its own and nothing below it.
        let (line, tier) =
            resolve_with_tier(&store, "door", &ctx(1, AwarenessLevel::Seeded, &tracker, &game)).unwrap();
        assert_eq!(tier, Tier::Inner);
        assert_eq!(line.text, "I should take the left door.");
    }

    #[test]
    fn later_era_skips_awareness_and_inner() {
        let mut entry = layered_entry();
        entry.eras.clear();
        let store = store_with(entry);
        let tracker = defiant_tracker(2);
        let game = GameSnapshot::new();
        let (line, tier) =
            resolve_with_tier(&store, "door", &ctx(3, AwarenessLevel::Uneasy, &tracker, &game)).unwrap();
        assert_eq!(tier, Tier::Variant(0));
        assert_eq!(line.text, "Left. Please.");
    }

    #[test]
    fn later_declared_variant_checked_first() {
        let mut entry = LineEntry::new("v", text("Default."));
        entry.variants.push(Variant {
            when: Condition::DefianceStreakAtLeast(1),
            then: over("Mild."),
        });
        entry.variants.push(Variant {
            when: Condition::DefianceStreakAtLeast(3),
            then: over("Furious."),
        });
        let store = store_with(entry);
        let game = GameSnapshot::new();

        let tracker = defiant_tracker(3);
        let line = resolve(&store, "v", &ctx(2, AwarenessLevel::Dormant, &tracker, &game)).unwrap();
        assert_eq!(line.text, "Furious.");

        let tracker = defiant_tracker(1);
        let line = resolve(&store, "v", &ctx(2, AwarenessLevel::Dormant, &tracker, &game)).unwrap();
        assert_eq!(line.text, "Mild.");

        let tracker = DecisionTracker::new();
        let (line, tier) = resolve_with_tier(&store, "v", &ctx(2, AwarenessLevel::Dormant, &tracker, &game)).unwrap();
        assert_eq!(tier, Tier::Default);
        assert_eq!(line.text, "Default.");
    }

    #[test]
    fn tier_fields_fall_back_to_entry() {
        let mut entry = LineEntry::new("a", text("Base."));
        entry.mood = Mood::Cold;
        entry.follow_up = Some("b".to_string());
        entry.delay = Some(700);
        entry.inner = Some(LineOverride {
            follow_up: Some("c".to_string()),
            ..over("Inner.")
        });
        let store = store_with(entry);
        let tracker = DecisionTracker::new();
        let game = GameSnapshot::new();
        let line = resolve(&store, "a", &ctx(1, AwarenessLevel::Dormant, &tracker, &game)).unwrap();
        assert_eq!(line.text, "Inner.");
        assert_eq!(line.mood, Mood::Cold);
        assert_eq!(line.follow_up.as_deref(), Some("c"));
        assert_eq!(line.delay_ms, 700);
    }

    #[test]
    fn missing_language_uses_primary() {
        let entry = LineEntry::new("a", text("Hello.").with("fr", "Bonjour."));
        let store = store_with(entry);
        let tracker = DecisionTracker::new();
        let game = GameSnapshot::new();
        let mut c = ctx(1, AwarenessLevel::Dormant, &tracker, &game);
        c.language = "fr";
        assert_eq!(resolve(&store, "a", &c).unwrap().text, "Bonjour.");
        c.language = "de";
        assert_eq!(resolve(&store, "a", &c).unwrap().text, "Hello.");
    }

    #[test]
    fn resolution_is_deterministic() {
        let store = store_with(layered_entry());
        let tracker = defiant_tracker(2);
        let game = GameSnapshot::new();
        let c = ctx(1, AwarenessLevel::Seeded, &tracker, &game);
        let first = resolve(&store, "door", &c);
        for _ in 0..10 {
            assert_eq!(resolve(&store, "door", &c), first);
        }
    }

    #[test]
    fn conditions_over_game_state() {
        let tracker = DecisionTracker::new();
        let mut game = GameSnapshot::new();
        game.enter("archive");
        game.decisions.insert("kept_key".to_string());
        game.puzzles_completed.insert("clock".to_string());
        game.play_seconds = 600;

        assert!(Condition::InRoom("archive".to_string()).evaluate(&tracker, &game));
        assert!(Condition::Visited("archive".to_string()).evaluate(&tracker, &game));
        assert!(Condition::DecisionMade("kept_key".to_string()).evaluate(&tracker, &game));
        assert!(Condition::PuzzleSolved("clock".to_string()).evaluate(&tracker, &game));
        assert!(Condition::PlaySecondsAtLeast(600).evaluate(&tracker, &game));
        assert!(Condition::ComplianceRateAtLeast(1.0).evaluate(&tracker, &game));
        assert!(!Condition::ComplianceRateBelow(0.5).evaluate(&tracker, &game));
        assert!(Condition::Any(vec![
            Condition::LoreFound("memo".to_string()),
            Condition::Not(Box::new(Condition::Explored("roof".to_string()))),
        ])
        .evaluate(&tracker, &game));
        assert!(!Condition::All(vec![
            Condition::InRoom("archive".to_string()),
            Condition::TotalDefianceAtLeast(1),
        ])
        .evaluate(&tracker, &game));
    }
}
