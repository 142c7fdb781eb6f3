//! Ranked stats lookup.
//!
//! The bot never trusts its stored stats for long; everything displayed is
//! re-fetched from the Slippi ranked service. `StatsProvider` is the seam the
//! rest of the crate depends on, `SlippiProvider` is the real GraphQL client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::SlippiConfig;
use crate::models::PlayerRecord;

/// Errors that can occur while fetching player stats.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Current ranked stats for one player, as returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStats {
    pub username: String,
    pub elo: f64,
    pub wins: u32,
    pub losses: u32,
    pub characters: Vec<String>,
}

impl PlayerStats {
    /// Build a roster record, keeping the connect code the caller asked for.
    pub fn into_record(self, code: &str) -> PlayerRecord {
        PlayerRecord {
            code: code.to_string(),
            username: self.username,
            elo: self.elo,
            wins: self.wins,
            losses: self.losses,
            characters: self.characters,
        }
    }
}

/// Source of ranked player stats.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Fetch current stats for a connect code.
    ///
    /// `Ok(None)` means the code is unknown or the player has no ranked
    /// profile; transport and schema problems are errors.
    async fn fetch_player(&self, code: &str) -> Result<Option<PlayerStats>, ProviderError>;
}

/// GraphQL client for the Slippi ranked gateway.
pub struct SlippiProvider {
    client: Client,
    endpoint: Url,
}

const CONNECT_CODE_QUERY: &str = "\
query ConnectCodeQuery($cc: String!) {
  getConnectCode(code: $cc) {
    user {
      displayName
      rankedNetplayProfile {
        ratingOrdinal
        wins
        losses
        characters { character }
      }
    }
  }
}";

#[derive(Debug, Deserialize)]
struct GqlResponse {
    data: Option<GqlData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlData {
    get_connect_code: Option<GqlConnectCode>,
}

#[derive(Debug, Deserialize)]
struct GqlConnectCode {
    user: Option<GqlUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlUser {
    display_name: Option<String>,
    ranked_netplay_profile: Option<GqlRankedProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlRankedProfile {
    rating_ordinal: Option<f64>,
    #[serde(default)]
    wins: Option<u32>,
    #[serde(default)]
    losses: Option<u32>,
    #[serde(default)]
    characters: Option<Vec<GqlCharacter>>,
}

#[derive(Debug, Deserialize)]
struct GqlCharacter {
    character: String,
}

impl SlippiProvider {
    /// Create a provider from configuration.
    pub fn new(config: &SlippiConfig) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(&config.base_url)
            .map_err(|e| ProviderError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, endpoint })
    }

    fn stats_from_user(user: GqlUser) -> Option<PlayerStats> {
        let profile = user.ranked_netplay_profile?;
        // A profile without a rating ordinal has never played ranked.
        let elo = profile.rating_ordinal?;

        Some(PlayerStats {
            username: user.display_name.unwrap_or_default(),
            elo,
            wins: profile.wins.unwrap_or(0),
            losses: profile.losses.unwrap_or(0),
            characters: profile
                .characters
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.character)
                .collect(),
        })
    }
}

#[async_trait]
impl StatsProvider for SlippiProvider {
    async fn fetch_player(&self, code: &str) -> Result<Option<PlayerStats>, ProviderError> {
        debug!("Fetching ranked stats for {}", code);

        let body = json!({
            "operationName": "ConnectCodeQuery",
            "variables": { "cc": code.to_uppercase() },
            "query": CONNECT_CODE_QUERY,
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GqlResponse = response.json().await?;

        let data = parsed
            .data
            .ok_or_else(|| ProviderError::Malformed("missing data field".to_string()))?;

        let user = match data.get_connect_code.and_then(|c| c.user) {
            Some(user) => user,
            None => return Ok(None),
        };

        Ok(Self::stats_from_user(user))
    }
}

/// Scripted provider for tests. Unknown codes resolve to `Ok(None)`; codes
/// listed in `failing` return a transport error.
#[cfg(test)]
pub struct MockProvider {
    players: std::collections::HashMap<String, PlayerStats>,
    failing: Vec<String>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new() -> Self {
        Self {
            players: std::collections::HashMap::new(),
            failing: Vec::new(),
        }
    }

    pub fn with_player(mut self, code: &str, stats: PlayerStats) -> Self {
        self.players.insert(crate::models::normalize_code(code), stats);
        self
    }

    pub fn with_failure(mut self, code: &str) -> Self {
        self.failing.push(crate::models::normalize_code(code));
        self
    }
}

#[cfg(test)]
pub fn test_stats(username: &str, elo: f64) -> PlayerStats {
    PlayerStats {
        username: username.to_string(),
        elo,
        wins: 20,
        losses: 10,
        characters: vec!["FALCO".to_string()],
    }
}

#[cfg(test)]
#[async_trait]
impl StatsProvider for MockProvider {
    async fn fetch_player(&self, code: &str) -> Result<Option<PlayerStats>, ProviderError> {
        let key = crate::models::normalize_code(code);
        if self.failing.contains(&key) {
            return Err(ProviderError::Malformed(format!("scripted failure for {code}")));
        }
        Ok(self.players.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_into_record_keeps_requested_code() {
        let record = test_stats("Fred", 1842.5).into_record("FRED#282");

        assert_eq!(record.code, "FRED#282");
        assert_eq!(record.username, "Fred");
        assert_eq!(record.elo, 1842.5);
    }

    #[test]
    fn test_provider_rejects_bad_base_url() {
        let config = SlippiConfig {
            base_url: "not a url".to_string(),
            timeout_seconds: 5,
        };
        assert!(matches!(
            SlippiProvider::new(&config),
            Err(ProviderError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_response_parsing_full_profile() {
        let json = r#"{
            "data": {
                "getConnectCode": {
                    "user": {
                        "displayName": "Fred",
                        "rankedNetplayProfile": {
                            "ratingOrdinal": 1842.5,
                            "wins": 20,
                            "losses": 10,
                            "characters": [{"character": "FALCO"}, {"character": "FOX"}]
                        }
                    }
                }
            }
        }"#;

        let parsed: GqlResponse = serde_json::from_str(json).unwrap();
        let user = parsed.data.unwrap().get_connect_code.unwrap().user.unwrap();
        let stats = SlippiProvider::stats_from_user(user).unwrap();

        assert_eq!(stats.username, "Fred");
        assert_eq!(stats.elo, 1842.5);
        assert_eq!(stats.characters, vec!["FALCO", "FOX"]);
    }

    #[test]
    fn test_response_parsing_unknown_code() {
        let json = r#"{"data": {"getConnectCode": null}}"#;
        let parsed: GqlResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.data.unwrap().get_connect_code.is_none());
    }

    #[test]
    fn test_unranked_profile_is_none() {
        let user = GqlUser {
            display_name: Some("Fred".to_string()),
            ranked_netplay_profile: Some(GqlRankedProfile {
                rating_ordinal: None,
                wins: None,
                losses: None,
                characters: None,
            }),
        };
        assert!(SlippiProvider::stats_from_user(user).is_none());
    }

    #[tokio::test]
    async fn test_mock_provider_scripts() {
        let provider = MockProvider::new()
            .with_player("A#1", test_stats("a", 1500.0))
            .with_failure("X#9");

        assert!(provider.fetch_player("a#1").await.unwrap().is_some());
        assert!(provider.fetch_player("B#2").await.unwrap().is_none());
        assert!(provider.fetch_player("x#9").await.is_err());
    }
}
