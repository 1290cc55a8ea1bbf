use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{GameId, UserId};

/// A player in the social graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub friends: BTreeSet<UserId>,
    #[serde(default)]
    pub played: BTreeSet<GameId>,
    #[serde(default)]
    pub liked: BTreeSet<GameId>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            friends: BTreeSet::new(),
            played: BTreeSet::new(),
            liked: BTreeSet::new(),
        }
    }

    /// Adds a friend; self-friendship is ignored
    pub fn add_friend(&mut self, friend: UserId) {
        if friend != self.id {
            self.friends.insert(friend);
        }
    }

    pub fn add_played(&mut self, game: GameId) {
        self.played.insert(game);
    }

    pub fn add_liked(&mut self, game: GameId) {
        self.liked.insert(game);
    }

    /// Games the user has either played or liked
    pub fn played_or_liked(&self) -> BTreeSet<GameId> {
        self.played.union(&self.liked).cloned().collect()
    }
}
