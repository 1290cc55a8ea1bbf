//! In-memory adjacency graph implementing [`FactProvider`].
//!
//! Backs the test suites and small deployments started from a JSON seed file
//! (`GRAPH_SEED_PATH`). Attribute nodes are interned per `(kind, name)` so
//! every game with genre "RPG" links to the same node.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{AttributeKind, AttributeNode, CategoryKind, Game, GameId, GameRef, User, UserId},
    services::facts::FactProvider,
};

/// Serialized form of a whole graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSeed {
    #[serde(default)]
    pub games: Vec<Game>,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Default)]
struct GraphData {
    games: HashMap<GameId, Game>,
    users: HashMap<UserId, User>,
    /// Symmetric friendship adjacency
    friendships: HashMap<UserId, BTreeSet<UserId>>,
    attribute_ids: HashMap<(AttributeKind, String), i64>,
    game_attributes: HashMap<GameId, Vec<AttributeNode>>,
    attribute_games: HashMap<(AttributeKind, i64), BTreeSet<GameId>>,
    next_attribute_id: i64,
}

impl GraphData {
    fn intern_attribute(&mut self, kind: AttributeKind, name: &str) -> AttributeNode {
        let key = (kind, name.to_string());
        let id = match self.attribute_ids.get(&key) {
            Some(id) => *id,
            None => {
                self.next_attribute_id += 1;
                self.attribute_ids.insert(key, self.next_attribute_id);
                self.next_attribute_id
            }
        };
        AttributeNode {
            kind,
            id,
            name: name.to_string(),
        }
    }

    fn unlink_game(&mut self, game_id: &GameId) {
        if let Some(nodes) = self.game_attributes.remove(game_id) {
            for node in nodes {
                if let Some(games) = self.attribute_games.get_mut(&(node.kind, node.id)) {
                    games.remove(game_id);
                }
            }
        }
    }

    fn insert_game(&mut self, game: Game) {
        self.unlink_game(&game.id);

        let mut links: Vec<(AttributeKind, String)> = Vec::new();
        links.extend(game.genres.iter().map(|g| (AttributeKind::Genre, g.clone())));
        links.extend(game.platforms.iter().map(|p| (AttributeKind::Platform, p.clone())));
        links.extend(game.developer.iter().map(|d| (AttributeKind::Developer, d.clone())));
        links.extend(game.features.iter().map(|f| (AttributeKind::Feature, f.clone())));

        let mut nodes = Vec::with_capacity(links.len());
        for (kind, name) in links {
            let node = self.intern_attribute(kind, &name);
            self.attribute_games
                .entry((node.kind, node.id))
                .or_default()
                .insert(game.id.clone());
            nodes.push(node);
        }

        self.game_attributes.insert(game.id.clone(), nodes);
        self.games.insert(game.id.clone(), game);
    }

    fn add_friendship(&mut self, a: &UserId, b: &UserId) {
        if a == b {
            return;
        }
        self.friendships.entry(a.clone()).or_default().insert(b.clone());
        self.friendships.entry(b.clone()).or_default().insert(a.clone());
        if let Some(user) = self.users.get_mut(a) {
            user.add_friend(b.clone());
        }
        if let Some(user) = self.users.get_mut(b) {
            user.add_friend(a.clone());
        }
    }

    fn insert_user(&mut self, user: User) {
        let friends: Vec<UserId> = user.friends.iter().cloned().collect();
        let id = user.id.clone();
        self.users.insert(id.clone(), user);
        for friend in friends {
            self.add_friendship(&id, &friend);
        }
    }

    fn game_ref(&self, game_id: &GameId) -> Option<GameRef> {
        self.games.get(game_id).map(Game::to_ref)
    }

    fn friends_of(&self, user_id: &UserId) -> HashSet<UserId> {
        self.friendships
            .get(user_id)
            .map(|friends| friends.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn category_names(&self, game_id: &GameId, kind: AttributeKind) -> BTreeSet<String> {
        self.game_attributes
            .get(game_id)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter(|n| n.kind == kind)
                    .map(|n| n.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Graph held entirely in memory behind an async read/write lock
pub struct InMemoryGraph {
    data: RwLock<GraphData>,
}

impl Default for InMemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self {
            data: RwLock::new(GraphData::default()),
        }
    }

    /// Builds a graph from a seed; games are loaded before users
    pub fn from_seed(seed: GraphSeed) -> Self {
        let mut data = GraphData::default();
        for game in seed.games {
            data.insert_game(game);
        }
        for user in seed.users {
            data.insert_user(user);
        }

        tracing::info!(
            games = data.games.len(),
            users = data.users.len(),
            attributes = data.attribute_ids.len(),
            "In-memory graph loaded"
        );

        Self {
            data: RwLock::new(data),
        }
    }

    /// Reads a JSON seed file
    pub async fn load_seed_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::FactProvider(format!("Failed to read graph seed {}: {}", path.display(), e))
        })?;
        let seed: GraphSeed = serde_json::from_str(&raw).map_err(|e| {
            AppError::FactProvider(format!("Malformed graph seed {}: {}", path.display(), e))
        })?;
        Ok(Self::from_seed(seed))
    }

    /// Adds or replaces a game and links it to its attribute nodes
    pub async fn insert_game(&self, game: Game) {
        self.data.write().await.insert_game(game);
    }

    /// Adds or replaces a user; listed friends become symmetric edges
    pub async fn insert_user(&self, user: User) {
        self.data.write().await.insert_user(user);
    }

    pub async fn add_friendship(&self, a: &UserId, b: &UserId) {
        self.data.write().await.add_friendship(a, b);
    }

    pub async fn add_like(&self, user_id: &UserId, game_id: &GameId) {
        if let Some(user) = self.data.write().await.users.get_mut(user_id) {
            user.add_liked(game_id.clone());
        }
    }

    pub async fn add_play(&self, user_id: &UserId, game_id: &GameId) {
        if let Some(user) = self.data.write().await.users.get_mut(user_id) {
            user.add_played(game_id.clone());
        }
    }
}

#[async_trait::async_trait]
impl FactProvider for InMemoryGraph {
    async fn find_game(&self, game_id: &GameId) -> AppResult<Option<GameRef>> {
        Ok(self.data.read().await.game_ref(game_id))
    }

    async fn user_exists(&self, user_id: &UserId) -> AppResult<bool> {
        Ok(self.data.read().await.users.contains_key(user_id))
    }

    async fn games_by_ids(&self, game_ids: &[GameId]) -> AppResult<Vec<Game>> {
        let data = self.data.read().await;
        Ok(game_ids
            .iter()
            .filter_map(|id| data.games.get(id).cloned())
            .collect())
    }

    async fn friends_of(&self, user_id: &UserId) -> AppResult<HashSet<UserId>> {
        Ok(self.data.read().await.friends_of(user_id))
    }

    async fn friends_of_friends(&self, user_id: &UserId) -> AppResult<HashSet<UserId>> {
        let data = self.data.read().await;
        let direct = data.friends_of(user_id);
        let reachable = direct
            .iter()
            .flat_map(|friend| data.friends_of(friend))
            .filter(|candidate| candidate != user_id && !direct.contains(candidate))
            .collect();
        Ok(reachable)
    }

    async fn liked_games(&self, user_id: &UserId) -> AppResult<Vec<GameRef>> {
        let data = self.data.read().await;
        let Some(user) = data.users.get(user_id) else {
            return Ok(Vec::new());
        };

        let mut games = Vec::with_capacity(user.liked.len());
        for game_id in &user.liked {
            match data.game_ref(game_id) {
                Some(game) => games.push(game),
                None => tracing::warn!(
                    user_id = %user_id,
                    game_id = %game_id,
                    "Like edge points at unknown game"
                ),
            }
        }
        Ok(games)
    }

    async fn played_or_liked_games(&self, user_id: &UserId) -> AppResult<HashSet<GameId>> {
        Ok(self
            .data
            .read()
            .await
            .users
            .get(user_id)
            .map(|user| user.played_or_liked().into_iter().collect())
            .unwrap_or_default())
    }

    async fn users_who_like(&self, game_id: &GameId) -> AppResult<HashSet<UserId>> {
        Ok(self
            .data
            .read()
            .await
            .users
            .values()
            .filter(|user| user.liked.contains(game_id))
            .map(|user| user.id.clone())
            .collect())
    }

    async fn attributes_of(&self, game_id: &GameId) -> AppResult<Vec<AttributeNode>> {
        Ok(self
            .data
            .read()
            .await
            .game_attributes
            .get(game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn games_sharing_attribute(&self, attribute: &AttributeNode) -> AppResult<Vec<GameRef>> {
        let data = self.data.read().await;
        Ok(data
            .attribute_games
            .get(&(attribute.kind, attribute.id))
            .map(|games| games.iter().filter_map(|id| data.game_ref(id)).collect())
            .unwrap_or_default())
    }

    async fn genres_of(&self, game_id: &GameId) -> AppResult<BTreeSet<String>> {
        Ok(self
            .data
            .read()
            .await
            .category_names(game_id, AttributeKind::Genre))
    }

    async fn platforms_of(&self, game_id: &GameId) -> AppResult<BTreeSet<String>> {
        Ok(self
            .data
            .read()
            .await
            .category_names(game_id, AttributeKind::Platform))
    }

    async fn developer_of(&self, game_id: &GameId) -> AppResult<Option<String>> {
        Ok(self
            .data
            .read()
            .await
            .category_names(game_id, AttributeKind::Developer)
            .into_iter()
            .next())
    }

    async fn games_matching(
        &self,
        genres: &BTreeSet<String>,
        platforms: &BTreeSet<String>,
    ) -> AppResult<Vec<GameRef>> {
        let data = self.data.read().await;
        let mut matches: Vec<GameRef> = data
            .games
            .values()
            .filter(|game| genres.is_empty() || !game.genres.is_disjoint(genres))
            .filter(|game| platforms.is_empty() || !game.platforms.is_disjoint(platforms))
            .map(Game::to_ref)
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    async fn category_edges(&self, kind: CategoryKind) -> AppResult<Vec<(GameId, String)>> {
        let data = self.data.read().await;
        let kind = AttributeKind::from(kind);
        let mut edges = Vec::new();
        for (game_id, nodes) in &data.game_attributes {
            for node in nodes.iter().filter(|n| n.kind == kind) {
                edges.push((game_id.clone(), node.name.clone()));
            }
        }
        Ok(edges)
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
