//! Namespace-aware key mapping.
//!
//! A key such as `user:123:profile` names the leaf key `profile` inside the
//! namespace `user:123`, which itself sits inside `user`. Every namespace
//! path owns a version counter stored in the backend. The mapped key embeds
//! the current version of each enclosing namespace:
//!
//! ```text
//! user:123:profile  ->  4:0:user:123:profile
//! ```
//!
//! Bumping a counter moves every key below that namespace to fresh backend
//! keys at once, which makes invalidation O(1) no matter how many entries
//! the namespace holds. The old entries are simply never read again.

use crate::config::{ChestConfig, DEFAULT_DELIMITER, DEFAULT_VERSION_PREFIX, parse_delimiter};
use crate::error::{ChestError, ChestResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use treasure_cache::{CacheBackend, CacheValue};

/// Translates caller keys into the literal keys stored in the backend.
///
/// Custom mappers can be installed on a
/// [`NamespacedCache`](crate::NamespacedCache) with `set_mapper`.
#[async_trait]
pub trait KeyMapper: Send + Sync {
    /// Map a (possibly namespaced) key to its backend key.
    ///
    /// Keys without a delimiter are returned unchanged.
    async fn parse(&self, key: &str) -> ChestResult<String>;

    /// Invalidate a namespace and everything nested under it.
    ///
    /// Returns `Ok(false)` without touching the backend when `namespace`
    /// is empty.
    async fn invalidate(&self, namespace: &str) -> ChestResult<bool>;

    /// Change the delimiter. It must be exactly one character.
    fn set_delimiter(&mut self, delimiter: &str) -> ChestResult<()>;

    /// The current delimiter.
    fn delimiter(&self) -> char;
}

/// Key mapper that versions every namespace level independently.
pub struct VersionedKeyMapper {
    backend: Arc<dyn CacheBackend>,
    delimiter: char,
    version_prefix: String,
    index: Mutex<VersionIndex>,
}

/// Last observed version per namespace path. A lower bound of the backend
/// counters, wiped on every invalidation.
#[derive(Default)]
struct VersionIndex {
    versions: HashMap<String, u64>,
    /// Bumped on every reset; a lookup that straddles one is not memoized.
    generation: u64,
}

impl VersionIndex {
    fn reset(&mut self) {
        self.versions.clear();
        self.generation += 1;
    }
}

impl VersionedKeyMapper {
    /// Create a mapper using `:` as delimiter and `ns` as version key prefix.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            delimiter: DEFAULT_DELIMITER,
            version_prefix: DEFAULT_VERSION_PREFIX.to_string(),
            index: Mutex::new(VersionIndex::default()),
        }
    }

    /// Create a mapper from facade configuration.
    pub fn from_config(backend: Arc<dyn CacheBackend>, config: &ChestConfig) -> Self {
        Self::new(backend)
            .with_delimiter(config.delimiter)
            .with_version_prefix(config.version_prefix.clone())
    }

    /// Set the delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the prefix of version counter keys.
    pub fn with_version_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.version_prefix = prefix.into();
        self
    }

    /// Backend key of the version counter for a namespace path,
    /// e.g. `ns:version:user:james`.
    pub fn version_key(&self, namespace: &str) -> String {
        let d = self.delimiter;
        format!("{}{d}version{d}{}", self.version_prefix, namespace)
    }

    /// Snapshot of the local version cache.
    pub async fn cached_versions(&self) -> HashMap<String, u64> {
        self.index.lock().await.versions.clone()
    }

    /// Current version of one namespace path, memoized in the index.
    async fn version_of(&self, namespace: &str) -> ChestResult<u64> {
        let generation = {
            let index = self.index.lock().await;
            if let Some(version) = index.versions.get(namespace) {
                return Ok(*version);
            }
            index.generation
        };

        let key = self.version_key(namespace);
        let version = match self.backend.fetch(&key).await? {
            Some(value) => counter_value(namespace, &value)?,
            None => self.seed(namespace, &key).await?,
        };

        // An invalidation ran meanwhile; the version may predate it.
        let mut index = self.index.lock().await;
        if index.generation == generation {
            index.versions.insert(namespace.to_string(), version);
        }
        Ok(version)
    }

    /// Start a never-seen namespace at version 0; first writer wins.
    async fn seed(&self, namespace: &str, key: &str) -> ChestResult<u64> {
        if self.backend.add(key, CacheValue::from(0u64), None).await? {
            debug!(namespace = %namespace, "Seeded namespace version");
            return Ok(0);
        }

        debug!(namespace = %namespace, "Namespace seeded concurrently, re-reading version");
        match self.backend.fetch(key).await? {
            Some(value) => counter_value(namespace, &value),
            None => Err(ChestError::VersionResolution {
                namespace: namespace.to_string(),
                reason: "counter vanished after a lost seeding race".to_string(),
            }),
        }
    }

    /// Bump the counter, seeding it at 1 when the namespace was never used.
    async fn bump(&self, key: &str) -> ChestResult<i64> {
        if self.backend.exists(key).await? {
            return Ok(self.backend.increment(key, 1).await?);
        }

        if self.backend.add(key, CacheValue::from(1u64), None).await? {
            return Ok(1);
        }

        // Someone seeded it in between; this invalidation still has to count.
        Ok(self.backend.increment(key, 1).await?)
    }
}

#[async_trait]
impl KeyMapper for VersionedKeyMapper {
    async fn parse(&self, key: &str) -> ChestResult<String> {
        let d = self.delimiter;
        let Some((namespace_path, leaf)) = key.rsplit_once(d) else {
            return Ok(key.to_string());
        };

        // Every prefix of the namespace path, outermost first: a, a:b, a:b:c
        let ends = namespace_path
            .match_indices(d)
            .map(|(end, _)| end)
            .chain(std::iter::once(namespace_path.len()));

        let mut mapped = String::with_capacity(key.len() * 2);
        for end in ends {
            let version = self.version_of(&namespace_path[..end]).await?;
            mapped.push_str(&version.to_string());
            mapped.push(d);
        }

        mapped.push_str(namespace_path);
        mapped.push(d);
        mapped.push_str(leaf);
        Ok(mapped)
    }

    async fn invalidate(&self, namespace: &str) -> ChestResult<bool> {
        if namespace.is_empty() {
            return Ok(false);
        }

        let result = self.bump(&self.version_key(namespace)).await;

        // Full reset, even on failure, so the next parse re-reads everything.
        self.index.lock().await.reset();

        let version = result?;
        debug!(namespace = %namespace, version, "Invalidated namespace");
        Ok(true)
    }

    fn set_delimiter(&mut self, delimiter: &str) -> ChestResult<()> {
        self.delimiter = parse_delimiter(delimiter)?;
        self.index.get_mut().reset();
        Ok(())
    }

    fn delimiter(&self) -> char {
        self.delimiter
    }
}

fn counter_value(namespace: &str, value: &CacheValue) -> ChestResult<u64> {
    value
        .as_int()
        .and_then(|version| u64::try_from(version).ok())
        .ok_or_else(|| {
            warn!(namespace = %namespace, "Namespace version counter is corrupt");
            ChestError::VersionResolution {
                namespace: namespace.to_string(),
                reason: format!("counter holds {:?}", value),
            }
        })
}
