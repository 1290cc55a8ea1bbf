use std::collections::{HashMap, HashSet};

use crate::{
    error::AppResult,
    models::{GameRef, UserId},
    services::facts::FactProvider,
};

use super::ranker::CandidateScores;

/// Similarity weight of every user sharing at least one liked game
async fn similar_users(
    provider: &dyn FactProvider,
    user_id: &UserId,
    liked: &HashSet<GameRef>,
) -> AppResult<HashMap<UserId, u32>> {
    let mut weights: HashMap<UserId, u32> = HashMap::new();

    for game in liked {
        for other in provider.users_who_like(&game.id).await? {
            if &other != user_id {
                *weights.entry(other).or_insert(0) += 1;
            }
        }
    }

    Ok(weights)
}

/// Scores games liked by users whose likes overlap with the user's
///
/// Another user's weight is the number of games both like. Each unseen game
/// a similar user likes receives that weight, summed over all similar users.
pub async fn score_by_similar_users(
    provider: &dyn FactProvider,
    user_id: &UserId,
) -> AppResult<CandidateScores> {
    let mut candidates = CandidateScores::new();

    let liked: HashSet<GameRef> = provider.liked_games(user_id).await?.into_iter().collect();
    if liked.is_empty() {
        tracing::debug!(user_id = %user_id, "User likes no games, no similar users");
        return Ok(candidates);
    }

    let excluded = provider.played_or_liked_games(user_id).await?;
    let weights = similar_users(provider, user_id, &liked).await?;

    for (other, weight) in &weights {
        let their_likes: HashSet<GameRef> = provider.liked_games(other).await?.into_iter().collect();
        for game in their_likes.iter().filter(|g| !excluded.contains(&g.id)) {
            candidates.add(game, *weight);
        }
    }

    tracing::debug!(
        user_id = %user_id,
        similar_users = weights.len(),
        candidates = candidates.len(),
        "Similar-user scoring finished"
    );

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Game, GameId, Strategy, User};
    use crate::services::facts::{GraphSeed, InMemoryGraph, MockFactProvider};

    fn gid(id: &str) -> GameId {
        GameId::new(id)
    }

    fn user(id: &str, liked: &[&str], played: &[&str]) -> User {
        let mut user = User::new(id, id);
        for game in liked {
            user.add_liked(gid(game));
        }
        for game in played {
            user.add_played(gid(game));
        }
        user
    }

    fn graph() -> InMemoryGraph {
        InMemoryGraph::from_seed(GraphSeed {
            games: ["a", "b", "c", "d", "e"]
                .iter()
                .map(|id| Game::new(*id, id.to_uppercase()))
                .collect(),
            users: vec![
                user("u", &["a", "b"], &["e"]),
                // shares a and b: weight 2
                user("v", &["a", "b", "c", "e"], &[]),
                // shares a: weight 1
                user("w", &["a", "c", "d"], &[]),
                // shares nothing
                user("z", &["d"], &[]),
            ],
        })
    }

    #[tokio::test]
    async fn test_weights_sum_across_similar_users() {
        let candidates = score_by_similar_users(&graph(), &UserId::new("u")).await.unwrap();

        assert_eq!(candidates.score_of(&gid("c")), Some(3));
        assert_eq!(candidates.score_of(&gid("d")), Some(1));
        assert_eq!(candidates.len(), 2);

        let ranked = candidates.rank(10, Strategy::Collaborative);
        assert_eq!(ranked[0].game_id, gid("c"));
    }

    #[tokio::test]
    async fn test_played_and_liked_games_are_excluded() {
        let candidates = score_by_similar_users(&graph(), &UserId::new("u")).await.unwrap();
        for seen in ["a", "b", "e"] {
            assert!(candidates.score_of(&gid(seen)).is_none());
        }
    }

    #[tokio::test]
    async fn test_user_without_likes_yields_nothing() {
        let candidates = score_by_similar_users(&graph(), &UserId::new("nobody"))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let mut provider = MockFactProvider::new();
        provider
            .expect_liked_games()
            .returning(|_| Ok(vec![GameRef::new("a", "A")]));
        provider
            .expect_played_or_liked_games()
            .returning(|_| Ok(HashSet::from([gid("a")])));
        provider
            .expect_users_who_like()
            .returning(|_| Err(AppError::FactProvider("bad row".to_string())));

        let result = score_by_similar_users(&provider, &UserId::new("u")).await;
        assert!(matches!(result, Err(AppError::FactProvider(_))));
    }
}
