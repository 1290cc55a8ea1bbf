use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    error::AppResult,
    services::{recommender::INDEX_BACKED_SOURCES, IndexSummary},
};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub index: IndexSummary,
    /// Cached responses deleted because they were computed from the old index
    pub invalidated_cache_entries: usize,
}

pub async fn category_index(State(state): State<AppState>) -> Json<IndexSummary> {
    Json(state.recommender.index_summary().await)
}

/// Rebuilds the category index from the fact provider and swaps it in
///
/// A failed rebuild leaves the previous index serving. Cache invalidation
/// failures are logged and do not fail the request.
pub async fn rebuild_category_index(
    State(state): State<AppState>,
) -> AppResult<Json<RebuildResponse>> {
    let index = state.recommender.rebuild_index().await?;

    let mut invalidated = 0;
    if let Some(cache) = &state.cache {
        for source in INDEX_BACKED_SOURCES {
            match cache.invalidate_source(source).await {
                Ok(removed) => invalidated += removed,
                Err(e) => tracing::warn!(error = %e, source = source, "Cache invalidation failed"),
            }
        }
    }

    tracing::info!(
        genres = index.genres,
        platforms = index.platforms,
        developers = index.developers,
        invalidated_cache_entries = invalidated,
        "Category index rebuilt"
    );

    Ok(Json(RebuildResponse {
        index,
        invalidated_cache_entries: invalidated,
    }))
}
