use serde::{Deserialize, Serialize};

use super::line::LineOverride;

/// A predicate over decision history and game state.
///
/// Conditions are plain data so that content files can declare them and
/// evaluation stays a pure function of its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    DefianceStreakAtLeast(u32),
    ComplianceStreakAtLeast(u32),
    MaxDefianceStreakAtLeast(u32),
    TotalDefianceAtLeast(u32),
    TotalComplianceAtLeast(u32),
    /// Compliance rate strictly below the given fraction.
    ComplianceRateBelow(f32),
    ComplianceRateAtLeast(f32),
    Explored(String),
    PuzzleSolved(String),
    LoreFound(String),
    Visited(String),
    InRoom(String),
    DecisionMade(String),
    PlaySecondsAtLeast(u64),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

/// A conditional override. Later-declared variants are checked first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub when: Condition,
    pub then: LineOverride,
}
