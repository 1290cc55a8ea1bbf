//! Graph fact provider abstraction
//!
//! The recommendation scorers never traverse the graph themselves. They ask a
//! `FactProvider` for materialized neighborhoods (friends, likes, attribute
//! nodes, category edges) and aggregate what comes back. Backends are
//! pluggable: an in-memory adjacency graph for tests and seed files, and
//! Postgres for deployments.
use std::collections::{BTreeSet, HashSet};

use crate::{
    error::AppResult,
    models::{AttributeNode, CategoryKind, Game, GameId, GameRef, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::{GraphSeed, InMemoryGraph};
pub use postgres::PgFactProvider;

/// Neighborhood lookups over the users/games graph
///
/// Missing nodes and missing relations produce empty results, never errors.
/// Errors are reserved for backend failures (connectivity, malformed rows)
/// and are passed through to the caller untouched. Implementations do not
/// retry.
///
/// Friendship is symmetric: if either user lists the other as a friend, each
/// appears in the other's `friends_of`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FactProvider: Send + Sync {
    /// Resolves a game node by id
    async fn find_game(&self, game_id: &GameId) -> AppResult<Option<GameRef>>;

    /// Whether a user node with this id exists
    async fn user_exists(&self, user_id: &UserId) -> AppResult<bool>;

    /// Full records for the given games; unknown ids are skipped
    async fn games_by_ids(&self, game_ids: &[GameId]) -> AppResult<Vec<Game>>;

    async fn friends_of(&self, user_id: &UserId) -> AppResult<HashSet<UserId>>;

    /// Users two friendship hops away, excluding the user and its direct friends
    async fn friends_of_friends(&self, user_id: &UserId) -> AppResult<HashSet<UserId>>;

    /// Games the user likes (also serves as "games liked by" for other users)
    async fn liked_games(&self, user_id: &UserId) -> AppResult<Vec<GameRef>>;

    async fn played_or_liked_games(&self, user_id: &UserId) -> AppResult<HashSet<GameId>>;

    async fn users_who_like(&self, game_id: &GameId) -> AppResult<HashSet<UserId>>;

    /// Every attribute node attached to the game, whatever the relation
    async fn attributes_of(&self, game_id: &GameId) -> AppResult<Vec<AttributeNode>>;

    /// Every game attached to this exact attribute node
    async fn games_sharing_attribute(&self, attribute: &AttributeNode) -> AppResult<Vec<GameRef>>;

    async fn genres_of(&self, game_id: &GameId) -> AppResult<BTreeSet<String>>;

    async fn platforms_of(&self, game_id: &GameId) -> AppResult<BTreeSet<String>>;

    async fn developer_of(&self, game_id: &GameId) -> AppResult<Option<String>>;

    /// Games in at least one of `genres` and on at least one of `platforms`
    ///
    /// An empty set disables that filter; with both empty every game matches.
    async fn games_matching(
        &self,
        genres: &BTreeSet<String>,
        platforms: &BTreeSet<String>,
    ) -> AppResult<Vec<GameRef>>;

    /// Every (game, category value) edge of one category family
    async fn category_edges(&self, kind: CategoryKind) -> AppResult<Vec<(GameId, String)>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
