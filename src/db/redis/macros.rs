/// Read-through caching for an async computation.
///
/// Evaluates to `Ok(value)` from the cache when `$key` is present. Otherwise
/// awaits `$block`, queues the result for storage with `$ttl` seconds to live,
/// and evaluates to `Ok` of the fresh value. A failed cache read is logged and
/// treated as a miss. Errors from `$block` are propagated with `?`, so the
/// macro must be used inside a function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let response: RecommendationResponse = cached!(cache, key, ttl, async {
///     recommender.recommend_by_game(&game_id, max).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let lookup = match $cache.get_from_cache(&$key).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, computing directly");
                None
            }
        };
        match lookup {
            Some(hit) => {
                tracing::debug!(key = %$key, "Cache hit");
                Ok(hit)
            }
            None => {
                let fresh = $block.await?;
                $cache.set_in_background(&$key, &fresh, $ttl);
                Ok(fresh)
            }
        }
    }};
}
