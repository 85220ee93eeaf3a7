/// Read-through caching on top of `Cache`.
///
/// Looks the key up first and returns the cached value on a hit. On a miss,
/// or when Redis cannot be reached, the block is awaited instead and its
/// value is queued for a background write if `$should_store` accepts it.
///
/// Must be used inside a function returning `AppResult<T>`, where `T` is the
/// cached type.
///
/// # Example
/// ```rust,ignore
/// cached!(cache, CacheKey::Catalog, 300, |_: &_| true, async { load_catalog().await })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $should_store:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) => Ok(cached),
            lookup => {
                if let Err(e) = lookup {
                    tracing::warn!(key = %$key, error = %e, "Cache read failed, loading from source");
                }
                let value = $block.await?;
                if ($should_store)(&value) {
                    $cache.set_in_background(&$key, &value, $ttl);
                }
                Ok(value)
            }
        }
    }};
}
