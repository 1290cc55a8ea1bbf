use std::collections::HashMap;

use crate::models::{GameId, GameRef, Recommendation, Strategy};

/// Per-call accumulator of candidate scores
///
/// Owned by a single scoring call and dropped when it returns. Contributions
/// to the same game merge additively.
#[derive(Debug, Default)]
pub struct CandidateScores {
    scores: HashMap<GameId, u32>,
    names: HashMap<GameId, String>,
}

impl CandidateScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `points` to the game's score, inserting it at zero first if new
    pub fn add(&mut self, game: &GameRef, points: u32) {
        let score = self.scores.entry(game.id.clone()).or_insert(0);
        *score = score.saturating_add(points);
        self.names
            .entry(game.id.clone())
            .or_insert_with(|| game.name.clone());
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn score_of(&self, game_id: &GameId) -> Option<u32> {
        self.scores.get(game_id).copied()
    }

    pub fn rank(&self, max_results: usize, strategy: Strategy) -> Vec<Recommendation> {
        rank(&self.scores, &self.names, max_results, strategy)
    }
}

/// Orders candidates by score descending and keeps the first `max_results`
///
/// Equal scores are ordered by game id ascending so repeated calls over the
/// same facts return the same list. A game missing from `names` is shown by
/// its id.
pub fn rank(
    scores: &HashMap<GameId, u32>,
    names: &HashMap<GameId, String>,
    max_results: usize,
    strategy: Strategy,
) -> Vec<Recommendation> {
    let mut entries: Vec<(&GameId, u32)> = scores.iter().map(|(id, score)| (id, *score)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    entries
        .into_iter()
        .take(max_results)
        .map(|(game_id, score)| Recommendation {
            game_id: game_id.clone(),
            game_name: names
                .get(game_id)
                .cloned()
                .unwrap_or_else(|| game_id.to_string()),
            score,
            strategy,
        })
        .collect()
}
