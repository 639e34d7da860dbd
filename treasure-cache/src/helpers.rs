//! Helper functions for common cache operations.

use crate::error::CacheResult;
use crate::traits::CacheBackend;
use crate::value::CacheValue;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Fetch a typed value from the cache.
pub async fn fetch_as<S, T>(store: &S, key: &str) -> CacheResult<Option<T>>
where
    S: CacheBackend + ?Sized,
    T: DeserializeOwned,
{
    match store.fetch(key).await? {
        Some(value) => value.deserialize().map(Some),
        None => Ok(None),
    }
}

/// Store a typed value as a structured entry.
pub async fn store_as<S, T>(
    store: &S,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> CacheResult<bool>
where
    S: CacheBackend + ?Sized,
    T: Serialize,
{
    store.store(key, CacheValue::structured(value)?, ttl).await
}

/// Remember a value for a given duration.
///
/// If the key exists, returns the cached value.
/// If not, calls the factory function, caches the result, and returns it.
pub async fn remember<S, T, F, Fut>(
    store: &S,
    key: &str,
    ttl: Option<Duration>,
    factory: F,
) -> CacheResult<T>
where
    S: CacheBackend + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = CacheResult<T>>,
{
    if let Some(value) = fetch_as(store, key).await? {
        return Ok(value);
    }

    let value = factory().await?;
    store_as(store, key, &value, ttl).await?;
    Ok(value)
}
