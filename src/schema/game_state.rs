use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Read-only view of the game world, supplied by the host on every call
/// that may resolve a line.
pub trait GameStateQuery {
    fn current_room(&self) -> Option<&str>;
    fn has_visited(&self, room: &str) -> bool;
    fn decision_made(&self, decision: &str) -> bool;
    fn puzzle_completed(&self, puzzle: &str) -> bool;
    /// Seconds of active play in this session.
    fn play_seconds(&self) -> u64;
}

/// Owned snapshot of game state. Hosts with their own world model can
/// implement [`GameStateQuery`] directly instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(default)]
    pub current_room: Option<String>,
    #[serde(default)]
    pub visited_rooms: FxHashSet<String>,
    #[serde(default)]
    pub decisions: FxHashSet<String>,
    #[serde(default)]
    pub puzzles_completed: FxHashSet<String>,
    #[serde(default)]
    pub play_seconds: u64,
}

impl GameSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `room`, marking it visited.
    pub fn enter(&mut self, room: &str) {
        self.current_room = Some(room.to_string());
        self.visited_rooms.insert(room.to_string());
    }
}

impl GameStateQuery for GameSnapshot {
    fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    fn has_visited(&self, room: &str) -> bool {
        self.visited_rooms.contains(room)
    }

    fn decision_made(&self, decision: &str) -> bool {
        self.decisions.contains(decision)
    }

    fn puzzle_completed(&self, puzzle: &str) -> bool {
        self.puzzles_completed.contains(puzzle)
    }

    fn play_seconds(&self) -> u64 {
        self.play_seconds
    }
}
