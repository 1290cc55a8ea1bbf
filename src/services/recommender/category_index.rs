use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{CategoryKind, GameId},
    services::facts::FactProvider,
};

/// Category value → games holding it
pub type CategoryMap = HashMap<String, HashSet<GameId>>;

/// Snapshot of genre, platform and developer membership
///
/// Built once from the fact provider and never mutated afterwards. Games with
/// no edge of a family are simply absent from that family's map.
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    pub genres: CategoryMap,
    pub platforms: CategoryMap,
    pub developers: CategoryMap,
    pub built_at: DateTime<Utc>,
    /// Bumped by every successful rebuild of a shared index
    pub generation: u64,
}

/// Sizes of an index snapshot, reported by the rebuild endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexSummary {
    pub genres: usize,
    pub platforms: usize,
    pub developers: usize,
    pub built_at: DateTime<Utc>,
    pub generation: u64,
}

impl CategoryIndex {
    /// An index with no categories; every membership check misses
    pub fn empty() -> Self {
        Self {
            genres: HashMap::new(),
            platforms: HashMap::new(),
            developers: HashMap::new(),
            built_at: Utc::now(),
            generation: 0,
        }
    }

    /// Scans every genre, platform and developer edge once
    pub async fn build(provider: &dyn FactProvider) -> AppResult<Self> {
        let genres = Self::group(provider.category_edges(CategoryKind::Genre).await?);
        let platforms = Self::group(provider.category_edges(CategoryKind::Platform).await?);
        let developers = Self::group(provider.category_edges(CategoryKind::Developer).await?);

        let index = Self {
            genres,
            platforms,
            developers,
            built_at: Utc::now(),
            generation: 0,
        };

        tracing::info!(
            provider = provider.name(),
            genres = index.genres.len(),
            platforms = index.platforms.len(),
            developers = index.developers.len(),
            "Category index built"
        );

        Ok(index)
    }

    fn group(edges: Vec<(GameId, String)>) -> CategoryMap {
        let mut map = CategoryMap::new();
        for (game_id, category) in edges {
            map.entry(category).or_default().insert(game_id);
        }
        map
    }

    pub fn map(&self, kind: CategoryKind) -> &CategoryMap {
        match kind {
            CategoryKind::Genre => &self.genres,
            CategoryKind::Platform => &self.platforms,
            CategoryKind::Developer => &self.developers,
        }
    }

    pub fn games_in(&self, kind: CategoryKind, category: &str) -> Option<&HashSet<GameId>> {
        self.map(kind).get(category)
    }

    pub fn contains(&self, kind: CategoryKind, category: &str, game_id: &GameId) -> bool {
        self.games_in(kind, category)
            .is_some_and(|games| games.contains(game_id))
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            genres: self.genres.len(),
            platforms: self.platforms.len(),
            developers: self.developers.len(),
            built_at: self.built_at,
            generation: self.generation,
        }
    }
}

/// Session-lifetime handle to the current index snapshot
///
/// Readers clone the inner `Arc` and release the lock immediately, so a
/// scoring call keeps one consistent snapshot even if a rebuild lands midway.
/// Rebuilds construct the new index completely before swapping it in.
#[derive(Clone)]
pub struct SharedCategoryIndex {
    current: Arc<RwLock<Arc<CategoryIndex>>>,
}

impl SharedCategoryIndex {
    pub fn new(index: CategoryIndex) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    pub fn empty() -> Self {
        Self::new(CategoryIndex::empty())
    }

    /// Builds the first snapshot from the provider
    pub async fn build(provider: &dyn FactProvider) -> AppResult<Self> {
        Ok(Self::new(CategoryIndex::build(provider).await?))
    }

    pub async fn snapshot(&self) -> Arc<CategoryIndex> {
        self.current.read().await.clone()
    }

    /// Rebuilds from the provider and swaps the result in
    ///
    /// On failure the previous snapshot stays in place. The swapped-in index
    /// carries the previous generation plus one.
    pub async fn rebuild(&self, provider: &dyn FactProvider) -> AppResult<Arc<CategoryIndex>> {
        let mut fresh = CategoryIndex::build(provider).await?;

        let mut current = self.current.write().await;
        fresh.generation = current.generation + 1;
        let fresh = Arc::new(fresh);
        *current = fresh.clone();

        Ok(fresh)
    }

    pub async fn generation(&self) -> u64 {
        self.current.read().await.generation
    }
}
