//! Command surface.
//!
//! Thin adapters from user commands to repository/publisher operations, each
//! returning a human-readable acknowledgment. The repository mutex is held
//! across the whole fetch-mutate-persist-publish sequence of an operation,
//! which is what serializes scheduler ticks against user commands.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::board::{AddOutcome, BoardRepository, RemoveOutcome, ResetOutcome};
use crate::gateway::MessagingGateway;
use crate::publish::{PublishError, PublishOutcome, Publisher};
use crate::sync::{SyncEngine, SyncState};

/// What a scheduled (or manual) refresh pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nothing on the roster to refresh.
    NoRoster,
    /// No player resolved this pass; old data kept, nothing posted.
    NoData,
    /// Roster swapped; publication attempted with this result.
    Published(PublishOutcome),
}

/// Shared bot core: the repository behind its single lock, plus the
/// collaborators every command needs.
pub struct CommandHandlers {
    repo: Mutex<BoardRepository>,
    engine: SyncEngine,
    publisher: Publisher,
    gateway: Arc<dyn MessagingGateway>,
    sync_state: std::sync::Mutex<SyncState>,
}

impl CommandHandlers {
    pub fn new(
        repo: BoardRepository,
        engine: SyncEngine,
        publisher: Publisher,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        Self {
            repo: Mutex::new(repo),
            engine,
            publisher,
            gateway,
            sync_state: std::sync::Mutex::new(SyncState::default()),
        }
    }

    /// `set-channel <name>`: resolve the channel and remember it.
    pub async fn set_channel(&self, name: &str) -> String {
        let resolved = match self.gateway.resolve_channel(name).await {
            Ok(resolved) => resolved,
            Err(e) => return format!("❌ Could not look up channel: {e}"),
        };

        match resolved {
            Some(channel) => {
                self.repo.lock().await.set_channel(channel);
                format!("✅ Leaderboard updates will be posted in #{name}.")
            }
            None => "⚠️ No such channel found!".to_string(),
        }
    }

    /// `add-player <code>`: fetch stats and insert into the roster.
    pub async fn add_player(&self, code: &str) -> String {
        let mut repo = self.repo.lock().await;
        match repo.add(code, self.engine.provider()).await {
            Ok(AddOutcome::Added(player)) => {
                format!("✅ Added {} ({:.1} ELO)", player.username, player.elo)
            }
            Ok(AddOutcome::AlreadyPresent) => {
                format!("⚠️ {code} is already on the leaderboard!")
            }
            Ok(AddOutcome::NotFound) => "❌ Player not found or has no ranked data!".to_string(),
            Err(e) => format!("❌ Error fetching player data: {e}"),
        }
    }

    /// `remove-player <code>`.
    pub async fn remove_player(&self, code: &str) -> String {
        let mut repo = self.repo.lock().await;
        match repo.remove(code) {
            RemoveOutcome::Removed(player) => format!(
                "❌ Removed {} ({}) from the leaderboard.",
                player.username, player.code
            ),
            RemoveOutcome::NotFound => format!("⚠️ Player {code} not found."),
        }
    }

    /// `reset-leaderboard <confirmation>`.
    pub async fn reset_leaderboard(&self, confirmation: &str) -> String {
        let mut repo = self.repo.lock().await;
        match repo.reset(confirmation) {
            ResetOutcome::Cleared => "✅ Leaderboard has been reset!".to_string(),
            ResetOutcome::Rejected => {
                "⚠️ You must type 'confirm' to reset the leaderboard.".to_string()
            }
        }
    }

    /// `show-leaderboard [refresh]`: optionally re-fetch stats, then post the
    /// rendered board.
    pub async fn show_leaderboard(&self, refresh: bool) -> String {
        let mut repo = self.repo.lock().await;

        if repo.is_empty() {
            return "🏆 No players in the leaderboard yet!".to_string();
        }

        let mut notes = String::new();
        if refresh {
            let report = self.engine.sync_all(repo.entries()).await;
            if repo.replace_all(report.updated) {
                notes.push_str("✅ Leaderboard updated from the Slippi API. ");
            } else {
                notes.push_str("⚠️ No updated player data available; showing saved data. ");
            }
        }

        match self.publisher.publish(&mut repo).await {
            Ok(PublishOutcome::Posted(_)) => format!("{notes}✅ Leaderboard posted!"),
            Ok(PublishOutcome::NoChannel) => {
                format!("{notes}⚠️ No leaderboard channel set. Use set-channel first.")
            }
            Ok(PublishOutcome::EmptyBoard) => "🏆 No players in the leaderboard yet!".to_string(),
            Err(e) => format!("{notes}❌ Failed to post leaderboard: {e}"),
        }
    }

    /// One full refresh-and-publish pass, used by the scheduler tick.
    ///
    /// A pass where no player resolves keeps the old roster and posts
    /// nothing.
    pub async fn refresh_and_publish(&self) -> Result<RefreshOutcome, PublishError> {
        let mut repo = self.repo.lock().await;

        if repo.is_empty() {
            return Ok(RefreshOutcome::NoRoster);
        }

        self.sync_state.lock().unwrap().last_refresh_started = Some(chrono::Utc::now());

        let report = self.engine.sync_all(repo.entries()).await;
        {
            let mut state = self.sync_state.lock().unwrap();
            state.last_refresh_completed = Some(chrono::Utc::now());
            state.last_updated_count = report.updated.len();
            state.last_failed_codes = report.failed.clone();
        }

        if !repo.replace_all(report.updated) {
            info!("Refresh produced no data; keeping previous leaderboard");
            return Ok(RefreshOutcome::NoData);
        }

        let outcome = self.publisher.publish(&mut repo).await?;
        Ok(RefreshOutcome::Published(outcome))
    }

    /// A one-line summary of the board and the last refresh pass.
    pub async fn status(&self) -> String {
        let repo = self.repo.lock().await;
        let channel = match repo.channel_id() {
            Some(channel) => format!("channel {channel}"),
            None => "no channel set".to_string(),
        };

        let state = self.sync_state.lock().unwrap().clone();
        let refresh = match state.last_refresh_completed {
            Some(at) => format!(
                "last refresh {} ({} updated, {} failed)",
                at.format("%Y-%m-%d %H:%M:%S UTC"),
                state.last_updated_count,
                state.last_failed_codes.len()
            ),
            None => "no refresh yet".to_string(),
        };

        format!("📊 {} players | {channel} | {refresh}", repo.entries().len())
    }

    /// Number of players currently on the board.
    pub async fn roster_size(&self) -> usize {
        self.repo.lock().await.entries().len()
    }
}
