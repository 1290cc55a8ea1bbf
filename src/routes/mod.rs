use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod admin;
pub mod games;
pub mod recommendations;
mod state;

pub use state::AppState;

/// Builds the application router with middleware applied
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/games/:game_id", get(games::get_game))
        .route(
            "/recommendations/games/:game_id",
            get(recommendations::by_game),
        )
        .route(
            "/recommendations/users/:user_id/preferences",
            get(recommendations::by_preferences),
        )
        .route(
            "/recommendations/users/:user_id/friends",
            get(recommendations::by_friends),
        )
        .route(
            "/recommendations/users/:user_id/similar",
            get(recommendations::by_similar_users),
        )
        .route(
            "/recommendations/genres/:genre",
            get(recommendations::by_genre),
        )
        .route("/admin/category-index", get(admin::category_index))
        .route(
            "/admin/category-index/rebuild",
            post(admin::rebuild_category_index),
        )
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "fact_provider": state.recommender.provider_name(),
            "cache_enabled": state.cache.is_some(),
        })),
    )
}
