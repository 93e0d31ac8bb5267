/// Read-through caching at a call site.
///
/// Expands to [`Cache::get_or_compute`](crate::db::Cache::get_or_compute):
/// returns the cached value for `$key` if present, otherwise awaits `$block`,
/// queues the result for caching with `$ttl` (an `Option<u64>` in seconds;
/// `None` never expires) and returns it. Cache failures never surface; errors
/// from `$block` do.
///
/// # Example
/// ```rust,ignore
/// let video: Video = cached!(self.cache, CacheKey::VideoFeatures(id), None, async move {
///     self.load_video(id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        $cache.get_or_compute(&$key, $ttl, || $block).await
    }};
}
