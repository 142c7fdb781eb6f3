//! # Slippi Board
//!
//! A Discord leaderboard bot for Slippi ranked Melee.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (players, ids, the durable snapshot)
//! - **storage**: Atomic snapshot persistence
//! - **provider**: Ranked stats lookup against the Slippi GraphQL gateway
//! - **gateway**: Discord message delivery (post/delete/resolve)
//! - **render**: Leaderboard image rendering
//! - **board**: The authoritative roster repository
//! - **sync**: Bulk stats refresh and the background scheduler
//! - **commands**: User command handlers over the serialized core
//! - **config**: Configuration loading and validation

pub mod board;
pub mod commands;
pub mod config;
pub mod gateway;
pub mod models;
pub mod provider;
pub mod publish;
pub mod render;
pub mod storage;
pub mod sync;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Bare numbers are minutes, matching the config's interval unit
        (s, 60)
    };

    let num: u64 = num_str.parse().ok()?;
    num.checked_mul(multiplier).map(Duration::from_secs)
}
