/// Property tests — awareness never regresses, the scheduler respects its
/// visible cap, and clearing leaves nothing behind.

use narrator_engine::core::awareness::{AwarenessLevel, Progression};
use narrator_engine::core::config::{AwarenessConfig, SchedulerConfig};
use narrator_engine::core::scheduler::{DialogueScheduler, NarratorMode};
use narrator_engine::schema::line::ResolvedLine;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Say { delay_ms: u64, len: usize },
    SayImmediate { len: usize },
    Tick(u64),
    Skip,
    Hide,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..3_000, 1usize..40).prop_map(|(delay_ms, len)| Op::Say { delay_ms, len }),
        (1usize..40).prop_map(|len| Op::SayImmediate { len }),
        (0u64..5_000).prop_map(Op::Tick),
        Just(Op::Skip),
        Just(Op::Hide),
    ]
}

fn line(n: usize, len: usize, delay_ms: u64) -> ResolvedLine {
    ResolvedLine::new(&format!("line_{}", n), &"x".repeat(len))
        .with_delay(delay_ms)
        .with_follow_up("next")
}

fn chain(completed: &ResolvedLine) -> Option<ResolvedLine> {
    // Follow-ups stop after one hop so chains terminate.
    if completed.id == "next" {
        None
    } else {
        Some(ResolvedLine::new("next", "and then").with_delay(100))
    }
}

proptest! {
    #[test]
    fn awareness_is_monotonic(era in 1u32..4, grants in prop::collection::vec(0u32..8, 0..30)) {
        let mut progression = Progression::new(era, AwarenessConfig::default());
        let cap = progression.cap();
        let mut last_level = AwarenessLevel::Dormant;
        let mut total = 0;
        for points in grants {
            progression.add_awareness(points, "test");
            total += points;
            prop_assert!(progression.level() >= last_level);
            prop_assert!(progression.level() <= cap);
            prop_assert_eq!(progression.points(), total);
            last_level = progression.level();
        }
        let expected = AwarenessLevel::ALL
            .iter()
            .copied()
            .filter(|l| *l <= cap && progression.threshold(*l) <= total)
            .max()
            .unwrap_or(AwarenessLevel::Dormant);
        prop_assert_eq!(progression.level(), expected);
    }

    #[test]
    fn scheduler_cap_and_clear(ops in prop::collection::vec(op(), 1..60)) {
        let config = SchedulerConfig::default();
        let max_visible = config.max_visible;
        let mut scheduler = DialogueScheduler::new(config, NarratorMode::Narrator);

        for (n, op) in ops.into_iter().enumerate() {
            match op {
                Op::Say { delay_ms, len } => scheduler.say(line(n, len, delay_ms)),
                Op::SayImmediate { len } => scheduler.say_immediate(line(n, len, 0)),
                Op::Tick(dt) => scheduler.tick(dt, chain),
                Op::Skip => scheduler.skip(chain),
                Op::Hide => scheduler.hide(),
            }
            prop_assert!(scheduler.visible_len() <= max_visible);
        }

        scheduler.clear();
        prop_assert_eq!(scheduler.pending_timers(), 0);
        prop_assert_eq!(scheduler.visible_len(), 0);
        prop_assert!(!scheduler.is_busy());
        scheduler.drain_events();
        scheduler.tick(1_000_000, chain);
        prop_assert!(scheduler.drain_events().is_empty());
    }
}
