//! Cache backend trait definition.

use crate::error::{CacheError, CacheResult};
use crate::value::CacheValue;
use async_trait::async_trait;
use std::time::Duration;

/// Capability contract every cache backend provides.
///
/// All operations may be called concurrently from many tasks (and, for
/// persistent backends, many processes) against the same store. Atomicity
/// of `increment`/`decrement` is the backend's responsibility.
///
/// A `ttl` of `None` or `Some(Duration::ZERO)` means the entry never
/// expires.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store a value only if the key is absent (or expired).
    ///
    /// # Returns
    ///
    /// Returns `Ok(true)` if this call wrote the value, `Ok(false)` if
    /// another entry already held the key.
    async fn add(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> CacheResult<bool>;

    /// Store a value unconditionally.
    async fn store(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> CacheResult<bool>;

    /// Store a value only if the key is already present.
    async fn replace(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> CacheResult<bool>;

    /// Check if a live entry exists for the key.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Fetch a value.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(value))` on a hit, `Ok(None)` on a miss or an
    /// expired entry, or an error if the backend failed.
    async fn fetch(&self, key: &str) -> CacheResult<Option<CacheValue>>;

    /// Atomically add `step` to an integer entry.
    ///
    /// # Returns
    ///
    /// Returns the new value. Fails with `NotFound` if the entry is absent
    /// and `NotNumeric` if it does not hold an integer.
    async fn increment(&self, key: &str, step: i64) -> CacheResult<i64>;

    /// Atomically subtract `step` from an integer entry.
    async fn decrement(&self, key: &str, step: i64) -> CacheResult<i64> {
        let step = step
            .checked_neg()
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        self.increment(key, step).await
    }

    /// Delete an entry.
    ///
    /// # Returns
    ///
    /// Returns `Ok(true)` if an entry was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every entry, namespace version counters included.
    async fn clear(&self) -> CacheResult<()>;

    // ========== Batch Operations (Parallel) ==========

    /// Fetch multiple keys concurrently.
    ///
    /// Results come back in the same order as `keys`.
    async fn fetch_many(&self, keys: &[&str]) -> CacheResult<Vec<Option<CacheValue>>> {
        use futures::future::try_join_all;

        let futures = keys.iter().map(|key| self.fetch(key));
        try_join_all(futures).await
    }

    /// Delete multiple keys concurrently.
    async fn delete_many(&self, keys: &[&str]) -> CacheResult<Vec<bool>> {
        use futures::future::try_join_all;

        let futures = keys.iter().map(|key| self.delete(key));
        try_join_all(futures).await
    }
}

/// Normalize a TTL so that zero means "never expires".
pub(crate) fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|ttl| !ttl.is_zero())
}
