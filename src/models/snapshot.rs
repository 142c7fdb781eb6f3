//! The durable snapshot written after every state change.

use serde::{Deserialize, Serialize};

use super::{ChannelId, MessageId, PlayerRecord};

/// Everything that must survive a restart: the roster, the target channel,
/// and the id of the last posted leaderboard message.
///
/// Field names match the `data.json` layout so existing deployments load
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub leaderboard: Vec<PlayerRecord>,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub last_leaderboard_message_id: Option<MessageId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::player::test_record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = Snapshot::default();
        assert!(snapshot.leaderboard.is_empty());
        assert!(snapshot.channel_id.is_none());
        assert!(snapshot.last_leaderboard_message_id.is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snapshot = Snapshot {
            leaderboard: vec![test_record("FRED#282", 1842.5)],
            channel_id: Some(ChannelId(111)),
            last_leaderboard_message_id: Some(MessageId(222)),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_snapshot_accepts_nulls() {
        let json = r#"{"leaderboard": [], "channel_id": null, "last_leaderboard_message_id": null}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }
}
