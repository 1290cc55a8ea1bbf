use crate::{
    error::AppResult,
    models::{CategoryKind, GameId},
    services::facts::FactProvider,
};

use super::{category_index::CategoryIndex, ranker::CandidateScores};

/// Scores every game in a genre by its critic score (0-10 scaled to 0-100)
///
/// Membership comes from the category index. Unknown genres yield nothing.
pub async fn score_by_genre(
    provider: &dyn FactProvider,
    index: &CategoryIndex,
    genre: &str,
) -> AppResult<CandidateScores> {
    let mut candidates = CandidateScores::new();

    let Some(members) = index.games_in(CategoryKind::Genre, genre) else {
        tracing::debug!(genre = %genre, "Genre not in category index");
        return Ok(candidates);
    };

    let mut ids: Vec<GameId> = members.iter().cloned().collect();
    ids.sort();

    for game in provider.games_by_ids(&ids).await? {
        candidates.add(&game.to_ref(), game.critic_points());
    }

    tracing::debug!(
        genre = %genre,
        members = ids.len(),
        candidates = candidates.len(),
        "Genre catalog scoring finished"
    );

    Ok(candidates)
}
