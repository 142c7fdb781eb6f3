//! Core data models for the leaderboard bot.

pub mod ids;
pub mod player;
pub mod snapshot;

pub use ids::*;
pub use player::*;
pub use snapshot::*;
