//! In-memory cache backend.

use crate::error::{CacheError, CacheResult};
use crate::traits::{CacheBackend, effective_ttl};
use crate::value::CacheValue;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// In-memory cache, shared by clones.
///
/// Useful for tests and for single-process deployments. Expiry is tracked
/// with [`tokio::time::Instant`], so a paused test clock drives it.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    data: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[derive(Clone)]
struct CacheEntry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: CacheValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: effective_ttl(ttl).map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

impl InMemoryCache {
    /// Create new in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Whether the cache holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired entries.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        self.data.write().await.retain(|_, entry| entry.is_live(now));
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn add(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> CacheResult<bool> {
        let mut data = self.data.write().await;
        if data.get(key).is_some_and(|entry| entry.is_live(Instant::now())) {
            return Ok(false);
        }

        data.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(true)
    }

    async fn store(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        self.data
            .write()
            .await
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(true)
    }

    async fn replace(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        let mut data = self.data.write().await;
        match data.get_mut(key) {
            Some(entry) if entry.is_live(Instant::now()) => {
                *entry = CacheEntry::new(value, ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let data = self.data.read().await;
        Ok(data
            .get(key)
            .is_some_and(|entry| entry.is_live(Instant::now())))
    }

    async fn fetch(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        let data = self.data.read().await;
        Ok(data
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn increment(&self, key: &str, step: i64) -> CacheResult<i64> {
        let mut data = self.data.write().await;
        let entry = data
            .get_mut(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        let current = entry
            .value
            .as_int()
            .ok_or_else(|| CacheError::NotNumeric(key.to_string()))?;
        let new_value = current
            .checked_add(step)
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        entry.value = CacheValue::from(new_value);

        Ok(new_value)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let removed = self.data.write().await.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(Instant::now())))
    }

    async fn clear(&self) -> CacheResult<()> {
        self.data.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_only_when_absent() {
        let cache = InMemoryCache::new();

        assert!(cache.add("name", "frodo".into(), None).await.unwrap());
        assert!(!cache.add("name", "sam".into(), None).await.unwrap());

        let value = cache.fetch("name").await.unwrap();
        assert_eq!(value, Some(CacheValue::from("frodo")));
    }

    #[tokio::test]
    async fn test_replace_only_when_present() {
        let cache = InMemoryCache::new();

        assert!(!cache.replace("ring", "one".into(), None).await.unwrap());
        assert!(!cache.exists("ring").await.unwrap());

        cache.store("ring", "one".into(), None).await.unwrap();
        assert!(cache.replace("ring", "precious".into(), None).await.unwrap());
        assert_eq!(
            cache.fetch("ring").await.unwrap(),
            Some(CacheValue::from("precious"))
        );
    }

    #[tokio::test]
    async fn test_increment_and_decrement() {
        let cache = InMemoryCache::new();
        cache.store("hits", 0i64.into(), None).await.unwrap();

        assert_eq!(cache.increment("hits", 1).await.unwrap(), 1);
        assert_eq!(cache.increment("hits", 5).await.unwrap(), 6);
        assert_eq!(cache.decrement("hits", 2).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_increment_missing_or_non_numeric_fails() {
        let cache = InMemoryCache::new();

        let err = cache.increment("missing", 1).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!cache.exists("missing").await.unwrap());

        cache.store("word", "hobbit".into(), None).await.unwrap();
        let err = cache.increment("word", 1).await.unwrap_err();
        assert!(matches!(err, CacheError::NotNumeric(_)));
        assert_eq!(
            cache.fetch("word").await.unwrap(),
            Some(CacheValue::from("hobbit"))
        );
    }

    #[tokio::test]
    async fn test_counter_overflow_fails() {
        let cache = InMemoryCache::new();
        cache.store("big", i64::MAX.into(), None).await.unwrap();

        let err = cache.increment("big", 1).await.unwrap_err();
        assert!(matches!(err, CacheError::Overflow(_)));
        assert_eq!(cache.fetch("big").await.unwrap(), Some(CacheValue::from(i64::MAX)));

        cache.store("small", 0i64.into(), None).await.unwrap();
        let err = cache.decrement("small", i64::MIN).await.unwrap_err();
        assert!(matches!(err, CacheError::Overflow(_)));
        assert_eq!(cache.decrement("small", i64::MAX).await.unwrap(), -i64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = InMemoryCache::new();
        cache
            .store("surname", "baggins".into(), Some(Duration::from_secs(2)))
            .await
            .unwrap();

        assert!(cache.exists("surname").await.unwrap());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.exists("surname").await.unwrap());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!cache.exists("surname").await.unwrap());
        assert_eq!(cache.fetch("surname").await.unwrap(), None);

        // An expired key is free for add again
        assert!(cache.add("surname", "gamgee".into(), None).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let cache = InMemoryCache::new();
        cache
            .store("forever", "young".into(), Some(Duration::ZERO))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert!(cache.exists("forever").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = InMemoryCache::new();
        cache.store("a", "1".into(), None).await.unwrap();
        cache.store("b", "2".into(), None).await.unwrap();

        assert!(cache.delete("a").await.unwrap());
        assert!(!cache.delete("a").await.unwrap());
        assert_eq!(cache.len().await, 1);

        cache.clear().await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_fetch_many_preserves_order() {
        let cache = InMemoryCache::new();
        cache.store("one", "1".into(), None).await.unwrap();
        cache.store("three", "3".into(), None).await.unwrap();

        let values = cache.fetch_many(&["one", "two", "three"]).await.unwrap();
        assert_eq!(
            values,
            vec![Some(CacheValue::from("1")), None, Some(CacheValue::from("3"))]
        );
    }
}
