//! Caller-facing cache with namespaces and a global key prefix.

use crate::config::{ChestConfig, parse_delimiter};
use crate::error::{ChestError, ChestResult};
use crate::mapper::{KeyMapper, VersionedKeyMapper};
use crate::operation::{CallArgs, CallOutcome, Operation};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use treasure_cache::{CacheBackend, CacheConfig, CacheValue, open_backend};

/// Cache facade that groups keys under invalidatable namespaces.
///
/// Every key goes through the same pipeline before it reaches the backend:
/// the global prefix is applied (`prefix:key`), then the key mapper turns
/// namespace segments into version numbers. `clear` is passed straight
/// through.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use treasure_cache::InMemoryCache;
/// use treasure_keymap::NamespacedCache;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), treasure_keymap::ChestError> {
/// let cache = NamespacedCache::new(Arc::new(InMemoryCache::new()));
///
/// cache.store("user:123:name", "Bilbo", None).await?;
/// assert!(cache.exists("user:123:name").await?);
///
/// // Drops user:123:name and anything else under user:123
/// cache.invalidate("user:123").await?;
/// assert!(!cache.exists("user:123:name").await?);
/// # Ok(())
/// # }
/// ```
pub struct NamespacedCache {
    backend: Arc<dyn CacheBackend>,
    mapper: Box<dyn KeyMapper>,
    prefix: Option<String>,
    delimiter: char,
    default_ttl: Option<Duration>,
}

impl NamespacedCache {
    /// Create a namespaced cache with the default configuration.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_config(backend, ChestConfig::default())
    }

    /// Create a namespaced cache with custom configuration.
    pub fn with_config(backend: Arc<dyn CacheBackend>, config: ChestConfig) -> Self {
        let mapper = VersionedKeyMapper::from_config(Arc::clone(&backend), &config);
        Self {
            backend,
            mapper: Box::new(mapper),
            prefix: config.prefix,
            delimiter: config.delimiter,
            default_ttl: config.default_ttl,
        }
    }

    /// Open the backend described by `cache_config` and wrap it.
    pub async fn open(cache_config: &CacheConfig, config: ChestConfig) -> ChestResult<Self> {
        let backend = open_backend(cache_config).await?;
        Ok(Self::with_config(backend, config))
    }

    /// Set the global prefix. An empty prefix disables prefixing.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
    }

    /// The global prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Set the namespace delimiter.
    ///
    /// Fails with a configuration error unless `delimiter` is exactly one
    /// character, leaving the previous delimiter in effect.
    pub fn set_delimiter(&mut self, delimiter: &str) -> ChestResult<()> {
        let parsed = parse_delimiter(delimiter)?;
        self.mapper.set_delimiter(delimiter)?;
        self.delimiter = parsed;
        debug!(delimiter = %parsed, "Changed namespace delimiter");
        Ok(())
    }

    /// The namespace delimiter.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Install a custom key mapper, configured with the current delimiter.
    pub fn set_mapper(&mut self, mut mapper: Box<dyn KeyMapper>) -> ChestResult<()> {
        mapper.set_delimiter(&self.delimiter.to_string())?;
        self.mapper = mapper;
        Ok(())
    }

    /// TTL applied to data writes that pass none.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    fn prefixed(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}{}", prefix, self.delimiter, key),
            None => key.to_string(),
        }
    }

    fn ttl_or_default(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.or(self.default_ttl)
    }

    /// The backend key a caller key maps to right now.
    pub async fn map_key(&self, key: &str) -> ChestResult<String> {
        let mapped = self.mapper.parse(&self.prefixed(key)).await?;
        trace!(key = %key, mapped = %mapped, "Mapped cache key");
        Ok(mapped)
    }

    /// Store a value if the key doesn't already exist.
    ///
    /// A `ttl` of `None` falls back to the configured default TTL. Zero, or
    /// `None` without a default, means the value never expires.
    pub async fn add(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
        ttl: Option<Duration>,
    ) -> ChestResult<bool> {
        let key = self.map_key(key).await?;
        let ttl = self.ttl_or_default(ttl);
        Ok(self.backend.add(&key, value.into(), ttl).await?)
    }

    /// Store a value, overwriting any entry with the same key.
    pub async fn store(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
        ttl: Option<Duration>,
    ) -> ChestResult<bool> {
        let key = self.map_key(key).await?;
        let ttl = self.ttl_or_default(ttl);
        Ok(self.backend.store(&key, value.into(), ttl).await?)
    }

    /// Replace a value, only if the key already exists.
    pub async fn replace(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
        ttl: Option<Duration>,
    ) -> ChestResult<bool> {
        let key = self.map_key(key).await?;
        let ttl = self.ttl_or_default(ttl);
        Ok(self.backend.replace(&key, value.into(), ttl).await?)
    }

    /// Check if a key exists.
    pub async fn exists(&self, key: &str) -> ChestResult<bool> {
        let key = self.map_key(key).await?;
        Ok(self.backend.exists(&key).await?)
    }

    /// Fetch a stored value.
    pub async fn fetch(&self, key: &str) -> ChestResult<Option<CacheValue>> {
        let key = self.map_key(key).await?;
        Ok(self.backend.fetch(&key).await?)
    }

    /// Atomically increment a stored number.
    pub async fn inc(&self, key: &str, step: i64) -> ChestResult<i64> {
        let key = self.map_key(key).await?;
        Ok(self.backend.increment(&key, step).await?)
    }

    /// Atomically decrement a stored number.
    pub async fn dec(&self, key: &str, step: i64) -> ChestResult<i64> {
        let key = self.map_key(key).await?;
        Ok(self.backend.decrement(&key, step).await?)
    }

    /// Delete an individual entry.
    pub async fn delete(&self, key: &str) -> ChestResult<bool> {
        let key = self.map_key(key).await?;
        Ok(self.backend.delete(&key).await?)
    }

    /// Clear the entire backend, namespace versions included.
    pub async fn clear(&self) -> ChestResult<()> {
        Ok(self.backend.clear().await?)
    }

    /// Invalidate every key in a namespace, nested namespaces included.
    ///
    /// Returns `Ok(false)` for an empty namespace, without touching the
    /// backend.
    pub async fn invalidate(&self, namespace: &str) -> ChestResult<bool> {
        if namespace.is_empty() {
            return Ok(false);
        }
        self.mapper.invalidate(&self.prefixed(namespace)).await
    }

    /// Fetch a typed value.
    pub async fn fetch_as<T: DeserializeOwned>(&self, key: &str) -> ChestResult<Option<T>> {
        let key = self.map_key(key).await?;
        Ok(treasure_cache::fetch_as(self.backend.as_ref(), &key).await?)
    }

    /// Store a typed value as a structured entry.
    pub async fn store_as<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> ChestResult<bool> {
        let key = self.map_key(key).await?;
        let ttl = self.ttl_or_default(ttl);
        Ok(treasure_cache::store_as(self.backend.as_ref(), &key, value, ttl).await?)
    }

    /// Return the cached value, or compute, store and return it.
    pub async fn remember<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        factory: F,
    ) -> ChestResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ChestResult<T>>,
    {
        if let Some(value) = self.fetch_as(key).await? {
            return Ok(value);
        }

        let value = factory().await?;
        self.store_as(key, &value, ttl).await?;
        Ok(value)
    }

    /// Run an operation given by name.
    ///
    /// Unknown names fail with [`ChestError::UnknownOperation`].
    pub async fn call(&self, method: &str, args: CallArgs) -> ChestResult<CallOutcome> {
        let operation: Operation = method.parse()?;
        self.execute(operation, args).await
    }

    /// Run an operation with loosely typed arguments.
    pub async fn execute(&self, operation: Operation, args: CallArgs) -> ChestResult<CallOutcome> {
        if !operation.takes_key() {
            self.clear().await?;
            return Ok(CallOutcome::Done);
        }

        let key = args.key.ok_or_else(|| ChestError::InvalidArguments {
            operation: operation.name(),
            reason: "a key is required".to_string(),
        })?;
        let step = args.step.unwrap_or(1);

        let outcome = match operation {
            Operation::Add | Operation::Store | Operation::Replace => {
                let value = args.value.ok_or_else(|| ChestError::InvalidArguments {
                    operation: operation.name(),
                    reason: "a value is required".to_string(),
                })?;
                let written = match operation {
                    Operation::Add => self.add(&key, value, args.ttl).await?,
                    Operation::Store => self.store(&key, value, args.ttl).await?,
                    _ => self.replace(&key, value, args.ttl).await?,
                };
                CallOutcome::Bool(written)
            }
            Operation::Exists => CallOutcome::Bool(self.exists(&key).await?),
            Operation::Fetch => CallOutcome::Value(self.fetch(&key).await?),
            Operation::Inc => CallOutcome::Counter(self.inc(&key, step).await?),
            Operation::Dec => CallOutcome::Counter(self.dec(&key, step).await?),
            Operation::Delete => CallOutcome::Bool(self.delete(&key).await?),
            Operation::Clear => CallOutcome::Done,
        };

        Ok(outcome)
    }
}
