/// Decision tracker — append-only compliance/defiance log with derived streaks.
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::schema::decision::DecisionRecord;

/// Tracks the player's choices against the narrator's instructions.
///
/// Compliance and defiance streaks are mutually exclusive: every record
/// zeroes the opposite streak.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionTracker {
    history: Vec<DecisionRecord>,
    total_compliance: u32,
    total_defiance: u32,
    compliance_streak: u32,
    defiance_streak: u32,
    max_defiance_streak: u32,
    explored: FxHashSet<String>,
    puzzles_solved: FxHashSet<String>,
    lore_found: FxHashSet<String>,
}

impl DecisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decision and update totals and streaks.
    pub fn record(&mut self, record: DecisionRecord) {
        if record.complied {
            self.total_compliance += 1;
            self.compliance_streak += 1;
            self.defiance_streak = 0;
        } else {
            self.total_defiance += 1;
            self.defiance_streak += 1;
            self.compliance_streak = 0;
            self.max_defiance_streak = self.max_defiance_streak.max(self.defiance_streak);
        }
        tracing::debug!(
            instruction = %record.instruction,
            choice = %record.choice,
            complied = record.complied,
            defiance_streak = self.defiance_streak,
            compliance_streak = self.compliance_streak,
            "decision recorded"
        );
        self.history.push(record);
    }

    pub fn history(&self) -> &[DecisionRecord] {
        &self.history
    }

    pub fn total_compliance(&self) -> u32 {
        self.total_compliance
    }

    pub fn total_defiance(&self) -> u32 {
        self.total_defiance
    }

    pub fn compliance_streak(&self) -> u32 {
        self.compliance_streak
    }

    pub fn defiance_streak(&self) -> u32 {
        self.defiance_streak
    }

    pub fn max_defiance_streak(&self) -> u32 {
        self.max_defiance_streak
    }

    pub fn total_decisions(&self) -> u32 {
        self.total_compliance + self.total_defiance
    }

    /// Fraction of decisions that complied. A tracker with no decisions
    /// reports `1.0`.
    pub fn compliance_rate(&self) -> f32 {
        let total = self.total_decisions();
        if total == 0 {
            return 1.0;
        }
        self.total_compliance as f32 / total as f32
    }

    pub fn mark_explored(&mut self, area: &str) {
        self.explored.insert(area.to_string());
    }

    pub fn mark_puzzle_solved(&mut self, puzzle: &str) {
        self.puzzles_solved.insert(puzzle.to_string());
    }

    pub fn mark_lore_found(&mut self, lore: &str) {
        self.lore_found.insert(lore.to_string());
    }

    pub fn has_explored(&self, area: &str) -> bool {
        self.explored.contains(area)
    }

    pub fn has_solved(&self, puzzle: &str) -> bool {
        self.puzzles_solved.contains(puzzle)
    }

    pub fn has_found_lore(&self, lore: &str) -> bool {
        self.lore_found.contains(lore)
    }
}
