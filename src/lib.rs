//! Narrator Engine — an in-game narrator that watches the player and
//! slowly stops pretending to be their inner voice.
//!
//! Dialogue lives in a static content table. Each request is resolved
//! against the current era, awareness level, language and decision
//! history, then handed to a simulated-time scheduler that types, queues,
//! dims and retires lines for the presentation layer to draw.

pub mod core;
pub mod schema;

pub use crate::core::session::{NarratorSession, NarratorSessionBuilder, SessionError};
