//! Recommendation scoring engine
//!
//! Four strategies turn graph neighborhoods into ranked game lists:
//! 1. Content-based: attribute nodes shared with a seed game
//! 2. Preference profile: genres and platforms of the user's liked games
//! 3. Friends: likes of direct friends, widened to friends-of-friends
//! 4. Similar users: likes of users with overlapping taste
//!
//! A genre catalog ranked by critic score is offered alongside them. Every
//! strategy accumulates into a per-call `CandidateScores` and finishes in the
//! shared ranker.
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    error::{AppError, AppResult},
    models::{Game, GameId, Recommendation, Strategy, UserId},
    services::facts::FactProvider,
};

pub mod category_index;
pub mod content;
pub mod friends;
pub mod genre;
pub mod preferences;
pub mod ranker;
pub mod similar_users;

pub use category_index::{CategoryIndex, IndexSummary, SharedCategoryIndex};
pub use ranker::{rank, CandidateScores};

pub const SOURCE_CONTENT: &str = "content";
pub const SOURCE_PREFERENCES: &str = "preferences";
pub const SOURCE_FRIENDS: &str = "friends";
pub const SOURCE_SIMILAR_USERS: &str = "similar_users";
pub const SOURCE_GENRE: &str = "genre";

/// Sources whose results depend on the category index
pub const INDEX_BACKED_SOURCES: [&str; 2] = [SOURCE_PREFERENCES, SOURCE_GENRE];

/// Entry point for every recommendation strategy
pub struct Recommender {
    provider: Arc<dyn FactProvider>,
    index: SharedCategoryIndex,
    max_results_limit: usize,
    deadline: Option<Duration>,
}

impl Recommender {
    /// Creates a recommender and builds the category index from the provider
    pub async fn new(provider: Arc<dyn FactProvider>, max_results_limit: usize) -> AppResult<Self> {
        let index = SharedCategoryIndex::build(provider.as_ref()).await?;
        Ok(Self::with_index(provider, index, max_results_limit))
    }

    /// Creates a recommender around an existing index
    pub fn with_index(
        provider: Arc<dyn FactProvider>,
        index: SharedCategoryIndex,
        max_results_limit: usize,
    ) -> Self {
        Self {
            provider,
            index,
            max_results_limit,
            deadline: None,
        }
    }

    /// Bounds each scoring call; an expired call returns no partial result
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Content-based recommendations for games similar to `game_id`
    pub async fn recommend_by_game(
        &self,
        game_id: &GameId,
        max_results: usize,
    ) -> AppResult<Vec<Recommendation>> {
        self.validate("game id", game_id.as_str(), max_results)?;
        let provider = self.provider.as_ref();

        self.run(SOURCE_CONTENT, game_id.as_str(), max_results, Strategy::Personal, async {
            content::score_by_game(provider, game_id).await
        })
        .await
    }

    /// Recommendations matching the genres and platforms the user likes
    pub async fn recommend_by_preferences(
        &self,
        user_id: &UserId,
        max_results: usize,
    ) -> AppResult<Vec<Recommendation>> {
        self.validate("user id", user_id.as_str(), max_results)?;
        let provider = self.provider.as_ref();
        let index = self.index.snapshot().await;

        self.run(SOURCE_PREFERENCES, user_id.as_str(), max_results, Strategy::Personal, async {
            if !provider.user_exists(user_id).await? {
                tracing::debug!(user_id = %user_id, "User not found");
                return Ok(CandidateScores::new());
            }
            preferences::score_by_preferences(provider, &index, user_id).await
        })
        .await
    }

    /// Recommendations from games the user's friends like
    pub async fn recommend_by_friends(
        &self,
        user_id: &UserId,
        max_results: usize,
    ) -> AppResult<Vec<Recommendation>> {
        self.validate("user id", user_id.as_str(), max_results)?;
        let provider = self.provider.as_ref();

        self.run(SOURCE_FRIENDS, user_id.as_str(), max_results, Strategy::Collaborative, async {
            if !provider.user_exists(user_id).await? {
                tracing::debug!(user_id = %user_id, "User not found");
                return Ok(CandidateScores::new());
            }
            friends::score_by_friends(provider, user_id, max_results).await
        })
        .await
    }

    /// Recommendations from users who like the same games
    pub async fn recommend_by_similar_users(
        &self,
        user_id: &UserId,
        max_results: usize,
    ) -> AppResult<Vec<Recommendation>> {
        self.validate("user id", user_id.as_str(), max_results)?;
        let provider = self.provider.as_ref();

        self.run(SOURCE_SIMILAR_USERS, user_id.as_str(), max_results, Strategy::Collaborative, async {
            if !provider.user_exists(user_id).await? {
                tracing::debug!(user_id = %user_id, "User not found");
                return Ok(CandidateScores::new());
            }
            similar_users::score_by_similar_users(provider, user_id).await
        })
        .await
    }

    /// Best-reviewed games of a genre
    pub async fn recommend_by_genre(
        &self,
        genre: &str,
        max_results: usize,
    ) -> AppResult<Vec<Recommendation>> {
        self.validate("genre", genre, max_results)?;
        let provider = self.provider.as_ref();
        let index = self.index.snapshot().await;

        self.run(SOURCE_GENRE, genre, max_results, Strategy::Personal, async {
            genre::score_by_genre(provider, &index, genre).await
        })
        .await
    }

    /// Full record of one game
    pub async fn game(&self, game_id: &GameId) -> AppResult<Game> {
        if game_id.as_str().trim().is_empty() {
            return Err(AppError::InvalidInput("game id must not be empty".to_string()));
        }
        self.provider
            .games_by_ids(std::slice::from_ref(game_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("game {}", game_id)))
    }

    /// Rebuilds the category index and swaps it in
    pub async fn rebuild_index(&self) -> AppResult<IndexSummary> {
        let index = self.index.rebuild(self.provider.as_ref()).await?;
        Ok(index.summary())
    }

    pub async fn index_summary(&self) -> IndexSummary {
        self.index.snapshot().await.summary()
    }

    /// Index generation a cached `source` result depends on; 0 for sources
    /// that do not read the category index
    pub async fn cache_generation(&self, source: &str) -> u64 {
        if INDEX_BACKED_SOURCES.iter().any(|s| *s == source) {
            self.index.generation().await
        } else {
            0
        }
    }

    /// Checks a request before any work is done for it
    ///
    /// `field` names the subject in the error message (e.g., "user id").
    pub fn validate(&self, field: &str, subject: &str, max_results: usize) -> AppResult<()> {
        if subject.trim().is_empty() {
            return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
        }
        if max_results == 0 {
            return Err(AppError::InvalidInput(
                "max_results must be at least 1".to_string(),
            ));
        }
        if max_results > self.max_results_limit {
            return Err(AppError::InvalidInput(format!(
                "max_results must not exceed {}",
                self.max_results_limit
            )));
        }
        Ok(())
    }

    /// Scores under the optional deadline, then ranks and truncates
    async fn run<F>(
        &self,
        source: &'static str,
        subject: &str,
        max_results: usize,
        strategy: Strategy,
        scoring: F,
    ) -> AppResult<Vec<Recommendation>>
    where
        F: Future<Output = AppResult<CandidateScores>>,
    {
        let start = Instant::now();

        let candidates = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, scoring).await.map_err(|_| {
                tracing::warn!(
                    source = source,
                    subject = %subject,
                    deadline_ms = deadline.as_millis(),
                    "Scoring deadline exceeded"
                );
                AppError::Timeout(format!("{} scoring exceeded {:?}", source, deadline))
            })??,
            None => scoring.await?,
        };

        let recommendations = candidates.rank(max_results, strategy);

        tracing::info!(
            source = source,
            subject = %subject,
            candidates = candidates.len(),
            returned = recommendations.len(),
            processing_time_ms = start.elapsed().as_millis(),
            "Recommendations computed"
        );

        Ok(recommendations)
    }
}
