//! Redis cache implementation.

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::traits::{CacheBackend, effective_ttl};
use crate::value::CacheValue;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::info;

/// Marks a structured payload; scalars are stored raw so INCRBY keeps working.
const STRUCTURED_MARKER: char = '\u{1}';

/// Adjusts a counter without creating it when absent.
const ADJUST_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return redis.call('INCRBY', KEYS[1], ARGV[1])
end
return false
"#;

/// Redis cache store.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Create a new Redis cache instance.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use treasure_cache::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let config = CacheConfig::redis("redis://localhost:6379");
    ///     let cache = RedisCache::new(config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| CacheError::Config("Redis backend requires a URL".to_string()))?;

        let client =
            Client::open(url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        info!(url = %url, "Connected Redis cache");

        Ok(Self { connection })
    }

    /// Get the underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    fn encode(value: &CacheValue) -> CacheResult<String> {
        match value {
            CacheValue::Scalar(text) => Ok(text.clone()),
            CacheValue::Structured(value) => serde_json::to_string(value)
                .map(|json| format!("{}{}", STRUCTURED_MARKER, json))
                .map_err(|e| CacheError::Serialization(e.to_string())),
        }
    }

    fn decode(raw: String) -> CacheValue {
        raw.strip_prefix(STRUCTURED_MARKER)
            .and_then(|json| serde_json::from_str(json).ok())
            .map(CacheValue::Structured)
            .unwrap_or(CacheValue::Scalar(raw))
    }

    /// Issue `SET` with an optional existence condition (`NX` / `XX`).
    async fn set_with(
        &self,
        key: &str,
        value: &CacheValue,
        ttl: Option<Duration>,
        condition: Option<&str>,
    ) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(Self::encode(value)?);

        if let Some(ttl) = effective_ttl(ttl) {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }
        if let Some(condition) = condition {
            cmd.arg(condition);
        }

        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn add(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> CacheResult<bool> {
        self.set_with(key, &value, ttl, Some("NX")).await
    }

    async fn store(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        self.set_with(key, &value, ttl, None).await
    }

    async fn replace(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        self.set_with(key, &value, ttl, Some("XX")).await
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn fetch(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value.map(Self::decode))
    }

    async fn increment(&self, key: &str, step: i64) -> CacheResult<i64> {
        let mut conn = self.connection.clone();
        let new_value: Option<i64> = redis::cmd("EVAL")
            .arg(ADJUST_SCRIPT)
            .arg(1)
            .arg(key)
            .arg(step)
            .query_async(&mut conn)
            .await
            .map_err(|e| match e.kind() {
                redis::ErrorKind::ResponseError if e.to_string().contains("overflow") => {
                    CacheError::Overflow(key.to_string())
                }
                redis::ErrorKind::ResponseError => CacheError::NotNumeric(key.to_string()),
                _ => CacheError::Redis(e),
            })?;

        new_value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}
