//! Plain data shared between the content files, the host game and the
//! runtime in [`crate::core`].

pub mod condition;
pub mod decision;
pub mod game_state;
pub mod line;
pub mod memory;
