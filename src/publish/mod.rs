//! Publication of the rendered leaderboard.
//!
//! One message per channel: the previous post is deleted best-effort before
//! the new artifact goes up. A delete that fails never blocks posting current
//! data; a stale duplicate in the channel is the acceptable degradation.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::board::BoardRepository;
use crate::gateway::{GatewayError, MessagingGateway};
use crate::models::MessageId;
use crate::render::Renderer;

/// The filename the artifact is uploaded under.
pub const ARTIFACT_FILENAME: &str = "leaderboard.svg";

/// Errors from a publish attempt.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// What a publish attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// New artifact posted; this is its message id.
    Posted(MessageId),
    /// No target channel configured; nothing rendered or posted.
    NoChannel,
    /// Empty roster; nothing to display.
    EmptyBoard,
}

/// Renders the board and manages the single outstanding posted message.
pub struct Publisher {
    gateway: Arc<dyn MessagingGateway>,
    renderer: Box<dyn Renderer>,
}

impl Publisher {
    pub fn new(gateway: Arc<dyn MessagingGateway>, renderer: Box<dyn Renderer>) -> Self {
        Self { gateway, renderer }
    }

    /// Render the current board and replace the previously posted message.
    ///
    /// The repository records the new message id (and persists) on success.
    pub async fn publish(
        &self,
        repo: &mut BoardRepository,
    ) -> Result<PublishOutcome, PublishError> {
        let channel = match repo.channel_id() {
            Some(channel) => channel,
            None => return Ok(PublishOutcome::NoChannel),
        };

        if repo.is_empty() {
            return Ok(PublishOutcome::EmptyBoard);
        }

        let image = self.renderer.render(repo.entries());

        if let Some(previous) = repo.last_message_id() {
            match self.gateway.delete_message(channel, previous).await {
                Ok(()) => {}
                // Already gone; nothing to clean up.
                Err(GatewayError::NotFound) => {}
                Err(e) => {
                    warn!("Could not delete previous leaderboard message {previous}: {e}");
                }
            }
        }

        let message = self
            .gateway
            .post_image(channel, ARTIFACT_FILENAME, image)
            .await?;
        repo.set_last_message_id(Some(message));

        info!("Posted leaderboard to channel {channel} as message {message}");
        Ok(PublishOutcome::Posted(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RecordingGateway;
    use crate::models::player::test_record;
    use crate::models::ChannelId;
    use crate::render::SvgRenderer;
    use crate::storage::SnapshotStore;
    use tempfile::TempDir;

    fn repo_with(dir: &TempDir, entries: Vec<crate::models::PlayerRecord>) -> BoardRepository {
        let mut repo =
            BoardRepository::load(SnapshotStore::new(dir.path().join("data.json"))).unwrap();
        repo.replace_all(entries);
        repo
    }

    fn publisher(gateway: Arc<RecordingGateway>) -> Publisher {
        Publisher::new(gateway, Box::new(SvgRenderer::new()))
    }

    #[tokio::test]
    async fn test_publish_without_channel_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_with(&dir, vec![test_record("A#1", 1500.0)]);
        let gateway = Arc::new(RecordingGateway::new());

        let outcome = publisher(gateway.clone()).publish(&mut repo).await.unwrap();

        assert_eq!(outcome, PublishOutcome::NoChannel);
        assert_eq!(gateway.posted_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_empty_board_short_circuits() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_with(&dir, vec![]);
        repo.set_channel(ChannelId(1));
        repo.set_last_message_id(Some(MessageId(99)));
        let gateway = Arc::new(RecordingGateway::new());

        let outcome = publisher(gateway.clone()).publish(&mut repo).await.unwrap();

        assert_eq!(outcome, PublishOutcome::EmptyBoard);
        assert_eq!(gateway.posted_count(), 0);
        // No delete either: the short circuit happens before any gateway call.
        assert!(gateway.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_posts_and_records_message_id() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_with(&dir, vec![test_record("A#1", 1500.0)]);
        repo.set_channel(ChannelId(1));
        let gateway = Arc::new(RecordingGateway::new());

        let outcome = publisher(gateway.clone()).publish(&mut repo).await.unwrap();

        let posted = match outcome {
            PublishOutcome::Posted(id) => id,
            other => panic!("expected Posted, got {other:?}"),
        };
        assert_eq!(repo.last_message_id(), Some(posted));
        assert_eq!(gateway.posted_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_deletes_previous_message_first() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_with(&dir, vec![test_record("A#1", 1500.0)]);
        repo.set_channel(ChannelId(1));
        repo.set_last_message_id(Some(MessageId(42)));
        let gateway = Arc::new(RecordingGateway::new());

        publisher(gateway.clone()).publish(&mut repo).await.unwrap();

        assert_eq!(
            gateway.deleted.lock().unwrap().as_slice(),
            &[(ChannelId(1), MessageId(42))]
        );
        assert_ne!(repo.last_message_id(), Some(MessageId(42)));
    }

    #[tokio::test]
    async fn test_publish_survives_not_found_delete() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_with(&dir, vec![test_record("A#1", 1500.0)]);
        repo.set_channel(ChannelId(1));
        repo.set_last_message_id(Some(MessageId(42)));
        let gateway = Arc::new(RecordingGateway::new());
        gateway.fail_next_delete(GatewayError::NotFound);

        let outcome = publisher(gateway.clone()).publish(&mut repo).await.unwrap();

        assert!(matches!(outcome, PublishOutcome::Posted(_)));
        assert_eq!(gateway.posted_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_survives_other_delete_errors() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_with(&dir, vec![test_record("A#1", 1500.0)]);
        repo.set_channel(ChannelId(1));
        repo.set_last_message_id(Some(MessageId(42)));
        let gateway = Arc::new(RecordingGateway::new());
        gateway.fail_next_delete(GatewayError::Api {
            status: 500,
            message: "boom".to_string(),
        });

        let outcome = publisher(gateway.clone()).publish(&mut repo).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Posted(_)));
    }
}
