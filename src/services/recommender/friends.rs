use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    error::AppResult,
    models::{GameId, GameRef, UserId},
    services::facts::FactProvider,
};

use super::ranker::CandidateScores;

/// A friend-of-friend's vote is worth `count / FRIEND_OF_FRIEND_DIVISOR`
pub const FRIEND_OF_FRIEND_DIVISOR: u32 = 2;
/// The second pass stops once candidates reach `max_results * EXPANSION_CAP_FACTOR`
pub const EXPANSION_CAP_FACTOR: usize = 2;

/// Counts, per unseen game, how many of `voters` like it
async fn tally_likes(
    provider: &dyn FactProvider,
    voters: &HashSet<UserId>,
    excluded: &HashSet<GameId>,
) -> AppResult<HashMap<GameId, (GameRef, u32)>> {
    let mut tally: HashMap<GameId, (GameRef, u32)> = HashMap::new();

    for voter in voters {
        let liked: HashSet<GameRef> = provider.liked_games(voter).await?.into_iter().collect();
        for game in liked.into_iter().filter(|g| !excluded.contains(&g.id)) {
            tally
                .entry(game.id.clone())
                .or_insert_with(|| (game, 0))
                .1 += 1;
        }
    }

    Ok(tally)
}

/// Scores games liked by the user's friends
///
/// Primary pass: one point per direct friend liking a game the user has
/// neither played nor liked. When that leaves fewer than `max_results`
/// candidates, friends-of-friends are consulted: each game's friend-of-friend
/// count contributes `count / 2` (integer division) on top of any primary
/// score. Games are merged most-liked first, and merging stops as soon as the
/// candidate set holds `2 * max_results` games.
pub async fn score_by_friends(
    provider: &dyn FactProvider,
    user_id: &UserId,
    max_results: usize,
) -> AppResult<CandidateScores> {
    let mut candidates = CandidateScores::new();

    let excluded = provider.played_or_liked_games(user_id).await?;
    let friends = provider.friends_of(user_id).await?;

    for (game, count) in tally_likes(provider, &friends, &excluded).await?.into_values() {
        candidates.add(&game, count);
    }

    let primary = candidates.len();
    if primary >= max_results {
        tracing::debug!(
            user_id = %user_id,
            friends = friends.len(),
            candidates = primary,
            "Friend scoring satisfied by direct friends"
        );
        return Ok(candidates);
    }

    let friends_of_friends = provider.friends_of_friends(user_id).await?;
    let tally = tally_likes(provider, &friends_of_friends, &excluded).await?;

    // Most-liked first, ties by game id, so the cap keeps the strongest games
    let ordered: BTreeMap<(std::cmp::Reverse<u32>, GameId), GameRef> = tally
        .into_iter()
        .map(|(id, (game, count))| ((std::cmp::Reverse(count), id), game))
        .collect();

    let cap = max_results.saturating_mul(EXPANSION_CAP_FACTOR);
    for ((std::cmp::Reverse(count), _), game) in ordered {
        if candidates.len() >= cap {
            break;
        }
        candidates.add(&game, count / FRIEND_OF_FRIEND_DIVISOR);
    }

    tracing::debug!(
        user_id = %user_id,
        friends = friends.len(),
        friends_of_friends = friends_of_friends.len(),
        primary_candidates = primary,
        candidates = candidates.len(),
        "Friend scoring expanded to friends-of-friends"
    );

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Game, Strategy, User};
    use crate::services::facts::{GraphSeed, InMemoryGraph, MockFactProvider};

    fn uid(id: &str) -> UserId {
        UserId::new(id)
    }

    fn gid(id: &str) -> GameId {
        GameId::new(id)
    }

    fn user(id: &str, friends: &[&str], liked: &[&str]) -> User {
        let mut user = User::new(id, id.to_uppercase());
        for friend in friends {
            user.add_friend(uid(friend));
        }
        for game in liked {
            user.add_liked(gid(game));
        }
        user
    }

    fn games(ids: &[(&str, &str)]) -> Vec<Game> {
        ids.iter().map(|(id, name)| Game::new(*id, *name)).collect()
    }

    #[tokio::test]
    async fn test_two_friends_liking_same_game() {
        let graph = InMemoryGraph::from_seed(GraphSeed {
            games: games(&[("nova", "Nova Drift")]),
            users: vec![
                user("u", &["f1", "f2"], &[]),
                user("f1", &[], &["nova"]),
                user("f2", &[], &["nova"]),
            ],
        });

        let candidates = score_by_friends(&graph, &uid("u"), 1).await.unwrap();
        let ranked = candidates.rank(1, Strategy::Collaborative);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].game_name, "Nova Drift");
        assert_eq!(ranked[0].score, 2);
    }

    #[tokio::test]
    async fn test_no_expansion_when_primary_suffices() {
        let mut provider = MockFactProvider::new();
        provider
            .expect_played_or_liked_games()
            .returning(|_| Ok(HashSet::new()));
        provider
            .expect_friends_of()
            .returning(|_| Ok(HashSet::from([uid("f1"), uid("f2")])));
        provider
            .expect_liked_games()
            .returning(|_| Ok(vec![GameRef::new("nova", "Nova Drift")]));
        provider.expect_friends_of_friends().never();

        let candidates = score_by_friends(&provider, &uid("u"), 1).await.unwrap();
        assert_eq!(candidates.score_of(&gid("nova")), Some(2));
    }

    #[tokio::test]
    async fn test_expansion_merges_half_weight() {
        // One primary candidate, max 5: friends-of-friends kick in
        let graph = InMemoryGraph::from_seed(GraphSeed {
            games: games(&[("star", "Star Path"), ("nova", "Nova Drift")]),
            users: vec![
                user("u", &["f1"], &[]),
                user("f1", &["x1", "x2", "x3"], &["star"]),
                user("x1", &[], &["star", "nova"]),
                user("x2", &[], &["star"]),
                user("x3", &[], &["star"]),
            ],
        });

        let candidates = score_by_friends(&graph, &uid("u"), 5).await.unwrap();
        // 1 from f1, plus 3 / 2 = 1 from friends-of-friends
        assert_eq!(candidates.score_of(&gid("star")), Some(2));
        // A single friend-of-friend vote rounds down to zero but stays a candidate
        assert_eq!(candidates.score_of(&gid("nova")), Some(0));
    }

    #[tokio::test]
    async fn test_excluded_games_never_scored() {
        let graph = InMemoryGraph::from_seed(GraphSeed {
            games: games(&[("seen", "Seen"), ("fresh", "Fresh")]),
            users: vec![
                user("u", &["f1"], &["seen"]),
                user("f1", &["x1"], &["seen", "fresh"]),
                user("x1", &[], &["seen"]),
            ],
        });

        let candidates = score_by_friends(&graph, &uid("u"), 5).await.unwrap();
        assert!(candidates.score_of(&gid("seen")).is_none());
        assert_eq!(candidates.score_of(&gid("fresh")), Some(1));
    }

    #[tokio::test]
    async fn test_expansion_stops_at_cap() {
        let mut provider = MockFactProvider::new();
        provider
            .expect_played_or_liked_games()
            .returning(|_| Ok(HashSet::new()));
        provider.expect_friends_of().returning(|_| Ok(HashSet::new()));
        provider
            .expect_friends_of_friends()
            .returning(|_| Ok(HashSet::from([uid("x1")])));
        provider.expect_liked_games().returning(|_| {
            Ok(vec![
                GameRef::new("a", "A"),
                GameRef::new("b", "B"),
                GameRef::new("c", "C"),
                GameRef::new("d", "D"),
                GameRef::new("e", "E"),
            ])
        });

        let candidates = score_by_friends(&provider, &uid("u"), 2).await.unwrap();
        assert_eq!(candidates.len(), 4);
        // Ties fall back to game id order, so "e" is the one left out
        assert!(candidates.score_of(&gid("e")).is_none());
    }

    #[tokio::test]
    async fn test_user_without_friends_yields_nothing() {
        let graph = InMemoryGraph::from_seed(GraphSeed {
            games: games(&[("nova", "Nova Drift")]),
            users: vec![user("u", &[], &[])],
        });
        let candidates = score_by_friends(&graph, &uid("u"), 3).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let mut provider = MockFactProvider::new();
        provider
            .expect_played_or_liked_games()
            .returning(|_| Err(AppError::FactProvider("connection refused".to_string())));

        let result = score_by_friends(&provider, &uid("u"), 3).await;
        assert!(matches!(result, Err(AppError::FactProvider(_))));
    }
}
