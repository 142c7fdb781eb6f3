//! The leaderboard repository.
//!
//! Single in-memory authority over the roster and publication state. Every
//! mutation re-sorts the roster (descending elo, stable ties) and writes a
//! fresh snapshot; a failed save is logged and the in-memory state stays
//! authoritative until the next successful save.

use thiserror::Error;
use tracing::{error, info};

use crate::models::{normalize_code, ChannelId, MessageId, PlayerRecord, Snapshot};
use crate::models::player::sort_by_elo;
use crate::provider::{ProviderError, StatsProvider};
use crate::storage::{SnapshotStore, StorageError};

/// Errors surfaced by repository operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Stats provider error: {0}")]
    Transport(#[from] ProviderError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),
}

/// Result of an `add` call.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added(PlayerRecord),
    AlreadyPresent,
    /// The code is unknown to the provider or has no ranked data.
    NotFound,
}

/// Result of a `remove` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    Removed(PlayerRecord),
    NotFound,
}

/// Result of a `reset` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Cleared,
    Rejected,
}

/// The phrase a caller must supply to clear the board.
pub const RESET_CONFIRMATION: &str = "confirm";

/// Authoritative roster plus publication state, mirrored to disk.
pub struct BoardRepository {
    entries: Vec<PlayerRecord>,
    channel_id: Option<ChannelId>,
    last_message_id: Option<MessageId>,
    store: SnapshotStore,
}

impl BoardRepository {
    /// Load repository state from the snapshot store.
    pub fn load(store: SnapshotStore) -> Result<Self, BoardError> {
        let snapshot = store.load()?;
        let mut entries = snapshot.leaderboard;
        sort_by_elo(&mut entries);

        Ok(Self {
            entries,
            channel_id: snapshot.channel_id,
            last_message_id: snapshot.last_leaderboard_message_id,
            store,
        })
    }

    pub fn entries(&self) -> &[PlayerRecord] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_id
    }

    pub fn last_message_id(&self) -> Option<MessageId> {
        self.last_message_id
    }

    /// Read-only copy of the durable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            leaderboard: self.entries.clone(),
            channel_id: self.channel_id,
            last_leaderboard_message_id: self.last_message_id,
        }
    }

    /// Add a player by connect code, fetching their current ranked stats.
    ///
    /// Duplicates are rejected on the normalized code before any network
    /// call; a code the provider cannot resolve is `NotFound`.
    pub async fn add(
        &mut self,
        code: &str,
        provider: &dyn StatsProvider,
    ) -> Result<AddOutcome, BoardError> {
        let normalized = normalize_code(code);
        if self.entries.iter().any(|p| p.normalized_code() == normalized) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        let stats = match provider.fetch_player(code).await? {
            Some(stats) => stats,
            None => return Ok(AddOutcome::NotFound),
        };

        let record = stats.into_record(code);
        info!("Adding {} ({} elo)", record.code, record.elo);
        self.entries.push(record.clone());
        sort_by_elo(&mut self.entries);
        self.persist();

        Ok(AddOutcome::Added(record))
    }

    /// Remove a player by connect code, case-insensitively.
    pub fn remove(&mut self, code: &str) -> RemoveOutcome {
        let normalized = normalize_code(code);
        let position = self
            .entries
            .iter()
            .position(|p| p.normalized_code() == normalized);

        match position {
            Some(index) => {
                let removed = self.entries.remove(index);
                info!("Removed {} from the leaderboard", removed.code);
                self.persist();
                RemoveOutcome::Removed(removed)
            }
            None => RemoveOutcome::NotFound,
        }
    }

    /// Clear the roster, gated on the exact confirmation phrase.
    pub fn reset(&mut self, confirmation: &str) -> ResetOutcome {
        if !confirmation.eq_ignore_ascii_case(RESET_CONFIRMATION) {
            return ResetOutcome::Rejected;
        }

        self.entries.clear();
        info!("Leaderboard reset");
        self.persist();
        ResetOutcome::Cleared
    }

    /// Swap the roster for freshly fetched records.
    ///
    /// An empty replacement is skipped entirely so a failed refresh never
    /// erases a usable board. Duplicate codes keep their first occurrence.
    /// Returns whether the swap was applied.
    pub fn replace_all(&mut self, new_entries: Vec<PlayerRecord>) -> bool {
        if new_entries.is_empty() {
            return false;
        }

        let mut seen = std::collections::HashSet::new();
        self.entries = new_entries
            .into_iter()
            .filter(|p| seen.insert(p.normalized_code()))
            .collect();
        sort_by_elo(&mut self.entries);
        self.persist();
        true
    }

    pub fn set_channel(&mut self, channel: ChannelId) {
        self.channel_id = Some(channel);
        self.persist();
    }

    pub fn set_last_message_id(&mut self, message: Option<MessageId>) {
        self.last_message_id = message;
        self.persist();
    }

    /// Write the current state to disk. A failure leaves the in-memory state
    /// authoritative and at risk until the next successful save.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            error!("Failed to save snapshot: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::player::test_record;
    use crate::provider::{test_stats, MockProvider};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn empty_repo(dir: &TempDir) -> BoardRepository {
        BoardRepository::load(SnapshotStore::new(dir.path().join("data.json"))).unwrap()
    }

    fn codes(repo: &BoardRepository) -> Vec<&str> {
        repo.entries().iter().map(|p| p.code.as_str()).collect()
    }

    #[tokio::test]
    async fn test_add_inserts_in_elo_order() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);
        repo.replace_all(vec![test_record("A#1", 1500.0), test_record("B#2", 1700.0)]);

        let provider = MockProvider::new().with_player("C#3", test_stats("c", 1600.0));
        let outcome = repo.add("C#3", &provider).await.unwrap();

        assert!(matches!(outcome, AddOutcome::Added(_)));
        assert_eq!(codes(&repo), vec!["B#2", "C#3", "A#1"]);
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);
        repo.replace_all(vec![test_record("FRED#282", 1500.0)]);

        let provider = MockProvider::new().with_player("fred#282", test_stats("f", 1600.0));
        let outcome = repo.add("fred#282", &provider).await.unwrap();

        assert_eq!(outcome, AddOutcome::AlreadyPresent);
        assert_eq!(repo.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_add_unknown_code_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);

        let provider = MockProvider::new();
        let outcome = repo.add("NOPE#0", &provider).await.unwrap();

        assert_eq!(outcome, AddOutcome::NotFound);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_add_surfaces_transport_error() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);

        let provider = MockProvider::new().with_failure("X#9");
        let result = repo.add("X#9", &provider).await;

        assert!(matches!(result, Err(BoardError::Transport(_))));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_remove_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);
        repo.replace_all(vec![
            test_record("B#2", 1700.0),
            test_record("C#3", 1600.0),
            test_record("A#1", 1500.0),
        ]);

        let outcome = repo.remove("a#1");
        assert!(matches!(outcome, RemoveOutcome::Removed(p) if p.code == "A#1"));
        assert_eq!(codes(&repo), vec!["B#2", "C#3"]);
    }

    #[test]
    fn test_remove_missing_player() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);

        assert_eq!(repo.remove("Z#0"), RemoveOutcome::NotFound);
    }

    #[test]
    fn test_reset_requires_exact_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);
        repo.replace_all(vec![test_record("A#1", 1500.0)]);

        assert_eq!(repo.reset("yes please"), ResetOutcome::Rejected);
        assert_eq!(repo.entries().len(), 1);

        assert_eq!(repo.reset("CONFIRM"), ResetOutcome::Cleared);
        assert!(repo.is_empty());
    }

    #[test]
    fn test_replace_all_empty_keeps_existing_roster() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);
        repo.replace_all(vec![test_record("A#1", 1500.0)]);

        assert!(!repo.replace_all(vec![]));
        assert_eq!(repo.entries().len(), 1);
    }

    #[test]
    fn test_replace_all_sorts_and_keeps_unique_codes() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);

        assert!(repo.replace_all(vec![
            test_record("A#1", 1500.0),
            test_record("B#2", 1700.0),
            test_record("C#3", 1600.0),
        ]));
        assert_eq!(codes(&repo), vec!["B#2", "C#3", "A#1"]);

        let mut seen: Vec<String> = repo.entries().iter().map(|p| p.normalized_code()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), repo.entries().len());
    }

    #[test]
    fn test_replace_all_drops_duplicate_codes() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);

        repo.replace_all(vec![
            test_record("A#1", 1500.0),
            test_record("a#1", 1800.0),
        ]);

        assert_eq!(codes(&repo), vec!["A#1"]);
        assert_eq!(repo.entries()[0].elo, 1500.0);
    }

    #[test]
    fn test_equal_elo_keeps_insertion_order() {
        let dir = TempDir::new().unwrap();
        let mut repo = empty_repo(&dir);

        repo.replace_all(vec![
            test_record("A#1", 1500.0),
            test_record("B#2", 1500.0),
            test_record("C#3", 1500.0),
        ]);
        assert_eq!(codes(&repo), vec!["A#1", "B#2", "C#3"]);
    }

    #[test]
    fn test_mutations_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("data.json"));

        {
            let mut repo = BoardRepository::load(store.clone()).unwrap();
            repo.replace_all(vec![test_record("A#1", 1500.0)]);
            repo.set_channel(ChannelId(42));
            repo.set_last_message_id(Some(MessageId(7)));
        }

        let reloaded = BoardRepository::load(store).unwrap();
        assert_eq!(codes(&reloaded), vec!["A#1"]);
        assert_eq!(reloaded.channel_id(), Some(ChannelId(42)));
        assert_eq!(reloaded.last_message_id(), Some(MessageId(7)));
    }
}
