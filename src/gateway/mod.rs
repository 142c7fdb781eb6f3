//! Message delivery.
//!
//! `MessagingGateway` is the only surface the publisher talks to when posting
//! or deleting the leaderboard artifact. `DiscordGateway` implements it over
//! the Discord REST API; tests script a `RecordingGateway` instead.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::DiscordConfig;
use crate::models::{ChannelId, MessageId};

const DISCORD_API: &str = "https://discord.com/api/v10";

/// Errors from the messaging gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Channel or message does not exist (or no longer exists).
    #[error("Not found")]
    NotFound,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Gateway not configured: {0}")]
    NotConfigured(String),
}

/// Chat-platform delivery operations the bot needs.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Resolve a human-readable channel name to its id.
    async fn resolve_channel(&self, name: &str) -> Result<Option<ChannelId>, GatewayError>;

    /// Post an image attachment, returning the new message's id.
    async fn post_image(
        &self,
        channel: ChannelId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageId, GatewayError>;

    /// Delete a previously posted message. Returns `NotFound` if it is
    /// already gone.
    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), GatewayError>;
}

/// Discord REST client.
pub struct DiscordGateway {
    client: Client,
    token: String,
    guild_id: Option<u64>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiChannel {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
}

impl DiscordGateway {
    /// Create a gateway from configuration, reading the bot token from the
    /// configured environment variable.
    pub fn new(config: &DiscordConfig) -> Result<Self, GatewayError> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            GatewayError::NotConfigured(format!("{} is not set", config.token_env))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            token,
            guild_id: config.guild_id,
            base_url: DISCORD_API.to_string(),
        })
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl MessagingGateway for DiscordGateway {
    async fn resolve_channel(&self, name: &str) -> Result<Option<ChannelId>, GatewayError> {
        let guild_id = self.guild_id.ok_or_else(|| {
            GatewayError::NotConfigured("discord.guild_id is required to resolve channels".to_string())
        })?;

        let url = format!("{}/guilds/{}/channels", self.base_url, guild_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let channels: Vec<ApiChannel> = response.json().await?;
        let found = channels
            .into_iter()
            .find(|c| c.name.as_deref() == Some(name))
            .and_then(|c| c.id.parse::<u64>().ok())
            .map(ChannelId);

        debug!("Resolved channel {:?} -> {:?}", name, found);
        Ok(found)
    }

    async fn post_image(
        &self,
        channel: ChannelId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageId, GatewayError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel);

        let payload = serde_json::json!({
            "attachments": [{ "id": 0, "filename": filename }]
        });
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part(
                "files[0]",
                Part::bytes(bytes).file_name(filename.to_string()),
            );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .multipart(form)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let message: ApiMessage = response.json().await?;
        let id = message.id.parse::<u64>().map_err(|_| GatewayError::Api {
            status: 200,
            message: format!("non-numeric message id {:?}", message.id),
        })?;

        Ok(MessageId(id))
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.base_url, channel, message
        );
        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth())
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

/// Scripted gateway for tests: records every call and returns canned results.
#[cfg(test)]
pub struct RecordingGateway {
    pub channels: std::collections::HashMap<String, ChannelId>,
    pub next_message_id: std::sync::atomic::AtomicU64,
    pub delete_result: std::sync::Mutex<Option<GatewayError>>,
    pub posted: std::sync::Mutex<Vec<(ChannelId, String, usize)>>,
    pub deleted: std::sync::Mutex<Vec<(ChannelId, MessageId)>>,
}

#[cfg(test)]
impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            channels: std::collections::HashMap::new(),
            next_message_id: std::sync::atomic::AtomicU64::new(1000),
            delete_result: std::sync::Mutex::new(None),
            posted: std::sync::Mutex::new(Vec::new()),
            deleted: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_channel(mut self, name: &str, id: ChannelId) -> Self {
        self.channels.insert(name.to_string(), id);
        self
    }

    /// Make the next delete call fail with the given error.
    pub fn fail_next_delete(&self, error: GatewayError) {
        *self.delete_result.lock().unwrap() = Some(error);
    }

    pub fn posted_count(&self) -> usize {
        self.posted.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn resolve_channel(&self, name: &str) -> Result<Option<ChannelId>, GatewayError> {
        Ok(self.channels.get(name).copied())
    }

    async fn post_image(
        &self,
        channel: ChannelId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageId, GatewayError> {
        self.posted
            .lock()
            .unwrap()
            .push((channel, filename.to_string(), bytes.len()));
        let id = self
            .next_message_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(MessageId(id))
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), GatewayError> {
        self.deleted.lock().unwrap().push((channel, message));
        match self.delete_result.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_response_parsing() {
        let json = r#"[{"id": "123", "name": "leaderboard", "type": 0},
                       {"id": "456", "name": null, "type": 1}]"#;
        let channels: Vec<ApiChannel> = serde_json::from_str(json).unwrap();

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name.as_deref(), Some("leaderboard"));
        assert!(channels[1].name.is_none());
    }

    #[tokio::test]
    async fn test_recording_gateway_assigns_message_ids() {
        let gateway = RecordingGateway::new();

        let first = gateway
            .post_image(ChannelId(1), "leaderboard.svg", vec![1, 2, 3])
            .await
            .unwrap();
        let second = gateway
            .post_image(ChannelId(1), "leaderboard.svg", vec![4])
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(gateway.posted_count(), 2);
    }

    #[tokio::test]
    async fn test_recording_gateway_scripted_delete_failure() {
        let gateway = RecordingGateway::new();
        gateway.fail_next_delete(GatewayError::NotFound);

        let result = gateway.delete_message(ChannelId(1), MessageId(2)).await;
        assert!(matches!(result, Err(GatewayError::NotFound)));

        // Only the next call fails; the script is consumed.
        assert!(gateway.delete_message(ChannelId(1), MessageId(3)).await.is_ok());
    }
}
