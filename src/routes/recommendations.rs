use std::future::Future;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    cached,
    db::CacheKey,
    error::{AppError, AppResult},
    models::{GameId, Recommendation, RecommendationResponse, UserId},
    services::recommender::{
        SOURCE_CONTENT, SOURCE_FRIENDS, SOURCE_GENRE, SOURCE_PREFERENCES, SOURCE_SIMILAR_USERS,
    },
};

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    /// Result bound; the configured default applies when absent
    ///
    /// Kept as text so that negative or non-numeric values are reported as
    /// `InvalidInput` rather than rejected by the extractor.
    pub max: Option<String>,
}

impl RecommendationQuery {
    pub fn max_results(&self, default: usize) -> AppResult<usize> {
        let Some(raw) = self.max.as_deref() else {
            return Ok(default);
        };
        let value: i64 = raw.trim().parse().map_err(|_| {
            AppError::InvalidInput(format!("max_results must be an integer, got '{}'", raw))
        })?;
        if value < 1 {
            return Err(AppError::InvalidInput(
                "max_results must be at least 1".to_string(),
            ));
        }
        usize::try_from(value)
            .map_err(|_| AppError::InvalidInput(format!("max_results is out of range: {}", value)))
    }
}

/// Wraps a scoring call in the response envelope, reading through the cache
///
/// Input is validated before the cache is consulted, so a bad request is
/// rejected the same way with or without Redis.
async fn respond<F>(
    state: &AppState,
    source: &'static str,
    field: &str,
    subject: &str,
    max: usize,
    compute: F,
) -> AppResult<Json<RecommendationResponse>>
where
    F: Future<Output = AppResult<Vec<Recommendation>>>,
{
    state.recommender.validate(field, subject, max)?;

    let build = async move {
        let recommendations = compute.await?;
        Ok::<_, AppError>(RecommendationResponse {
            source: source.to_string(),
            subject: subject.to_string(),
            max_results: max,
            recommendations,
            generated_at: Utc::now(),
        })
    };

    let response = match &state.cache {
        Some(cache) => {
            let generation = state.recommender.cache_generation(source).await;
            let key = CacheKey::recommendations(source, subject, max, generation);
            let response: AppResult<RecommendationResponse> =
                cached!(cache, key, state.cache_ttl_secs, build);
            response?
        }
        None => build.await?,
    };

    Ok(Json(response))
}

pub async fn by_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let max = query.max_results(state.default_max_results)?;
    let game_id = GameId::new(game_id);

    respond(&state, SOURCE_CONTENT, "game id", game_id.as_str(), max, async {
        state.recommender.recommend_by_game(&game_id, max).await
    })
    .await
}

pub async fn by_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let max = query.max_results(state.default_max_results)?;
    let user_id = UserId::new(user_id);

    respond(&state, SOURCE_PREFERENCES, "user id", user_id.as_str(), max, async {
        state.recommender.recommend_by_preferences(&user_id, max).await
    })
    .await
}

pub async fn by_friends(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let max = query.max_results(state.default_max_results)?;
    let user_id = UserId::new(user_id);

    respond(&state, SOURCE_FRIENDS, "user id", user_id.as_str(), max, async {
        state.recommender.recommend_by_friends(&user_id, max).await
    })
    .await
}

pub async fn by_similar_users(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let max = query.max_results(state.default_max_results)?;
    let user_id = UserId::new(user_id);

    respond(&state, SOURCE_SIMILAR_USERS, "user id", user_id.as_str(), max, async {
        state.recommender.recommend_by_similar_users(&user_id, max).await
    })
    .await
}

pub async fn by_genre(
    State(state): State<AppState>,
    Path(genre): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let max = query.max_results(state.default_max_results)?;

    respond(&state, SOURCE_GENRE, "genre", &genre, max, async {
        state.recommender.recommend_by_genre(&genre, max).await
    })
    .await
}
