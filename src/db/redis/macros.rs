/// Read-through lookup of a resolved track record.
///
/// Returns the cached record when the feature cache has a fresh one.
/// Otherwise awaits `$block`, writes the record back under the same id
/// and returns it.
///
/// Cache failures never surface here: `FeatureCache` already degrades
/// them to a miss or a skipped write. Errors from `$block` are propagated
/// with `?`.
///
/// `$cache` is a `FeatureCache`, `$key` the track id and `$block` a future
/// yielding `Result<TrackRecord, E>`.
///
/// ```rust,ignore
/// let record = cached!(self.cache, track_id, async move {
///     self.provider.fetch_track(track_id).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        if let Some(cached) = $cache.get(&$key).await {
            tracing::info!(track_id = %$key, "Cache hit");
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set(&$key, &value).await;
            Ok(value)
        }
    }};
}
