use serde::{Deserialize, Serialize};

/// One compliance/defiance choice made by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// What the narrator told the player to do.
    pub instruction: String,
    /// What the player actually did.
    pub choice: String,
    pub complied: bool,
    /// Session clock in milliseconds when the choice was recorded.
    pub timestamp_ms: u64,
}

impl DecisionRecord {
    pub fn new(instruction: &str, choice: &str, complied: bool, timestamp_ms: u64) -> Self {
        Self {
            instruction: instruction.to_string(),
            choice: choice.to_string(),
            complied,
            timestamp_ms,
        }
    }
}
