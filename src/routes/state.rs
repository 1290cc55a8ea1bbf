use std::sync::Arc;

use crate::{config::Config, db::Cache, services::Recommender};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    /// Response cache; `None` disables caching
    pub cache: Option<Cache>,
    pub default_max_results: usize,
    pub cache_ttl_secs: u64,
}

impl AppState {
    pub fn new(recommender: Arc<Recommender>, config: &Config) -> Self {
        Self {
            recommender,
            cache: None,
            default_max_results: config.default_max_results,
            cache_ttl_secs: config.recommendation_cache_ttl_secs,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }
}
