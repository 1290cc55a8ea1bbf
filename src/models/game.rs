use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{GameId, GameRef};

/// A video game with its catalog metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    /// Display name (e.g., "Chrono Quest")
    pub name: String,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    /// Platforms the game is available on
    #[serde(default)]
    pub platforms: BTreeSet<String>,
    #[serde(default)]
    pub developer: Option<String>,
    /// Critic score on a 0-10 scale
    #[serde(default)]
    pub critic_score: f64,
    /// Sales in millions of units
    #[serde(default)]
    pub sales: f64,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default)]
    pub cross_platform: bool,
    /// Feature nodes such as "Multiplayer"
    #[serde(default)]
    pub features: BTreeSet<String>,
}

fn default_max_players() -> u32 {
    1
}

impl Game {
    /// Creates a game with only an id and a name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: GameId::new(id),
            name: name.into(),
            genres: BTreeSet::new(),
            platforms: BTreeSet::new(),
            developer: None,
            critic_score: 0.0,
            sales: 0.0,
            release_year: None,
            rating: None,
            max_players: default_max_players(),
            cross_platform: false,
            features: BTreeSet::new(),
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genres.insert(genre.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platforms.insert(platform.into());
        self
    }

    pub fn with_developer(mut self, developer: impl Into<String>) -> Self {
        self.developer = Some(developer.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    pub fn with_critic_score(mut self, critic_score: f64) -> Self {
        self.critic_score = critic_score;
        self
    }

    pub fn to_ref(&self) -> GameRef {
        GameRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Critic score scaled to an integer 0-100 ranking score
    pub fn critic_points(&self) -> u32 {
        let scaled = (self.critic_score * 10.0).round();
        if scaled.is_finite() && scaled > 0.0 {
            scaled as u32
        } else {
            0
        }
    }
}
