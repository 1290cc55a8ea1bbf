use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{Game, GameId},
};

use super::AppState;

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> AppResult<Json<Game>> {
    let game = state.recommender.game(&GameId::new(game_id)).await?;
    Ok(Json(game))
}
