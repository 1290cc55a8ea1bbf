use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::GameId;

/// Family of signals a recommendation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Item attributes or the user's own preference profile
    Personal,
    /// Other users' behavior (friends, friends-of-friends, similar users)
    Collaborative,
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Personal => write!(f, "PERSONAL"),
            Strategy::Collaborative => write!(f, "COLLABORATIVE"),
        }
    }
}

/// A single ranked recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub game_id: GameId,
    pub game_name: String,
    pub score: u32,
    pub strategy: Strategy,
}

impl Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (score: {}, strategy: {})",
            self.game_name, self.score, self.strategy
        )
    }
}

/// Response body for every recommendation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    /// Which scorer produced the list (e.g., "friends", "content")
    pub source: String,
    /// The seed game, user or genre the list was computed for
    pub subject: String,
    pub max_results: usize,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}
