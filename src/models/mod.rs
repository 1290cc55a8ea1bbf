use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod game;
pub mod recommendation;
pub mod user;

pub use game::Game;
pub use recommendation::{Recommendation, RecommendationResponse, Strategy};
pub use user::User;

/// Identifier of a game node in the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

/// Identifier of a user node in the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A game as returned by graph lookups: identity plus display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameRef {
    pub id: GameId,
    pub name: String,
}

impl GameRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: GameId::new(id),
            name: name.into(),
        }
    }
}

/// Relation through which an attribute node is attached to a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Genre,
    Platform,
    Developer,
    Feature,
}

impl AttributeKind {
    /// Name of the kind as stored in the `attributes.kind` column
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Genre => "genre",
            AttributeKind::Platform => "platform",
            AttributeKind::Developer => "developer",
            AttributeKind::Feature => "feature",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_lowercase().as_str() {
            "genre" => Some(AttributeKind::Genre),
            "platform" => Some(AttributeKind::Platform),
            "developer" => Some(AttributeKind::Developer),
            "feature" => Some(AttributeKind::Feature),
            _ => None,
        }
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A genre, platform, developer or feature node
///
/// Identity is the `(kind, id)` pair: two games share an attribute only when
/// both are linked to the same node, not merely to nodes with equal names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeNode {
    pub kind: AttributeKind,
    pub id: i64,
    pub name: String,
}

impl PartialEq for AttributeNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for AttributeNode {}

impl std::hash::Hash for AttributeNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

/// Category families cached by the category index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    Genre,
    Platform,
    Developer,
}

impl From<CategoryKind> for AttributeKind {
    fn from(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::Genre => AttributeKind::Genre,
            CategoryKind::Platform => AttributeKind::Platform,
            CategoryKind::Developer => AttributeKind::Developer,
        }
    }
}
