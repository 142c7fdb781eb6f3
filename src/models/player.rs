//! Player roster records.

use serde::{Deserialize, Deserializer, Serialize};

/// One player on the leaderboard.
///
/// `code` is the Slippi connect code (e.g. `FRED#282`) and is unique on a
/// board after case-insensitive normalization. `elo` is the ranked rating
/// ordinal and the sort key for the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub code: String,
    pub username: String,
    pub elo: f64,
    pub wins: u32,
    pub losses: u32,
    #[serde(default, deserialize_with = "characters_compat")]
    pub characters: Vec<String>,
}

/// Accept either a list of character names or the single comma-joined string
/// older data files stored.
fn characters_compat<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Characters {
        List(Vec<String>),
        Joined(String),
    }

    match Option::<Characters>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Characters::List(list)) => Ok(list),
        Some(Characters::Joined(joined)) => Ok(joined
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()),
    }
}

impl PlayerRecord {
    /// The connect code lowered for case-insensitive comparison.
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }
}

/// Normalize a connect code for identity comparison.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Sort records descending by elo.
///
/// Uses a stable sort, so entries with equal elo keep the relative order
/// they had before the call.
pub fn sort_by_elo(entries: &mut [PlayerRecord]) {
    entries.sort_by(|a, b| b.elo.partial_cmp(&a.elo).unwrap_or(std::cmp::Ordering::Equal));
}

#[cfg(test)]
pub(crate) fn test_record(code: &str, elo: f64) -> PlayerRecord {
    PlayerRecord {
        code: code.to_string(),
        username: format!("user-{code}"),
        elo,
        wins: 10,
        losses: 5,
        characters: vec!["FOX".to_string()],
    }
}
