use std::collections::{BTreeSet, HashSet};

use crate::{
    error::AppResult,
    models::{CategoryKind, GameId, UserId},
    services::facts::FactProvider,
};

use super::{category_index::CategoryIndex, ranker::CandidateScores};

/// Points per preferred genre a candidate belongs to
pub const GENRE_MATCH_WEIGHT: u32 = 2;
/// Points per preferred platform a candidate is available on
pub const PLATFORM_MATCH_WEIGHT: u32 = 1;

/// What a user's liked games say about their taste
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceProfile {
    pub genres: BTreeSet<String>,
    pub platforms: BTreeSet<String>,
    /// Games already played or liked
    pub excluded: HashSet<GameId>,
}

impl PreferenceProfile {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.platforms.is_empty()
    }
}

/// Collects the genres and platforms of every game the user likes
pub async fn derive_profile(
    provider: &dyn FactProvider,
    user_id: &UserId,
) -> AppResult<PreferenceProfile> {
    let mut profile = PreferenceProfile::default();

    for game in provider.liked_games(user_id).await? {
        profile.genres.extend(provider.genres_of(&game.id).await?);
        profile.platforms.extend(provider.platforms_of(&game.id).await?);
    }
    profile.excluded = provider.played_or_liked_games(user_id).await?;

    Ok(profile)
}

/// Scores unplayed games by how well they fit the user's preference profile
///
/// Candidates must sit in a preferred genre and on a preferred platform (an
/// empty preference set does not filter). Scores come from the category index
/// so a game in several preferred genres earns credit for each. A user with no
/// liked genres or platforms gets no candidates rather than arbitrary
/// zero-scored games.
pub async fn score_by_preferences(
    provider: &dyn FactProvider,
    index: &CategoryIndex,
    user_id: &UserId,
) -> AppResult<CandidateScores> {
    let mut candidates = CandidateScores::new();

    let profile = derive_profile(provider, user_id).await?;
    if profile.is_empty() {
        tracing::debug!(user_id = %user_id, "No preference signal for user");
        return Ok(candidates);
    }

    let matching = provider
        .games_matching(&profile.genres, &profile.platforms)
        .await?;

    for game in matching.iter().filter(|g| !profile.excluded.contains(&g.id)) {
        let genre_hits = profile
            .genres
            .iter()
            .filter(|genre| index.contains(CategoryKind::Genre, genre, &game.id))
            .count() as u32;
        let platform_hits = profile
            .platforms
            .iter()
            .filter(|platform| index.contains(CategoryKind::Platform, platform, &game.id))
            .count() as u32;

        candidates.add(
            game,
            genre_hits * GENRE_MATCH_WEIGHT + platform_hits * PLATFORM_MATCH_WEIGHT,
        );
    }

    tracing::debug!(
        user_id = %user_id,
        preferred_genres = profile.genres.len(),
        preferred_platforms = profile.platforms.len(),
        excluded = profile.excluded.len(),
        candidates = candidates.len(),
        "Preference scoring finished"
    );

    Ok(candidates)
}
