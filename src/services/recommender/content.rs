use std::collections::HashSet;

use crate::{
    error::AppResult,
    models::GameId,
    services::facts::FactProvider,
};

use super::ranker::CandidateScores;

/// Scores games by the attribute nodes they share with a seed game
///
/// Every (candidate, shared attribute node) pair is worth one point, so a game
/// sharing genre, platform and developer nodes with the seed scores 3. The
/// seed itself is never a candidate. An unknown seed or a seed without
/// attributes yields no candidates.
pub async fn score_by_game(
    provider: &dyn FactProvider,
    seed_id: &GameId,
) -> AppResult<CandidateScores> {
    let mut candidates = CandidateScores::new();

    let Some(seed) = provider.find_game(seed_id).await? else {
        tracing::debug!(game_id = %seed_id, "Seed game not found");
        return Ok(candidates);
    };

    let attributes: HashSet<_> = provider.attributes_of(&seed.id).await?.into_iter().collect();

    for attribute in &attributes {
        let sharing: HashSet<_> = provider
            .games_sharing_attribute(attribute)
            .await?
            .into_iter()
            .collect();

        for game in sharing.iter().filter(|g| g.id != seed.id) {
            candidates.add(game, 1);
        }
    }

    tracing::debug!(
        game_id = %seed_id,
        attributes = attributes.len(),
        candidates = candidates.len(),
        "Content-based scoring finished"
    );

    Ok(candidates)
}
