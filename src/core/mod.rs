//! Runtime pieces of the narrator: content, state and scheduling.

pub mod awareness;
pub mod config;
pub mod content;
pub mod resolve;
pub mod scheduler;
pub mod session;
pub mod timers;
pub mod tracker;
