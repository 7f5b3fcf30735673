use rustc_hash::FxHashSet;

/// Cross-session memory owned by the host's persistence layer.
///
/// The narrator only ever writes through [`NarratorMemory::mark_revealed`].
pub trait NarratorMemory {
    fn playthroughs(&self) -> u32;
    fn endings_seen(&self) -> &FxHashSet<String>;
    fn is_revealed(&self) -> bool;
    fn mark_revealed(&mut self);
}

/// Volatile memory for tests, tools and single-session hosts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemory {
    pub playthroughs: u32,
    pub endings_seen: FxHashSet<String>,
    pub revealed: bool,
}

impl NarratorMemory for InMemoryMemory {
    fn playthroughs(&self) -> u32 {
        self.playthroughs
    }

    fn endings_seen(&self) -> &FxHashSet<String> {
        &self.endings_seen
    }

    fn is_revealed(&self) -> bool {
        self.revealed
    }

    fn mark_revealed(&mut self) {
        self.revealed = true;
    }
}
