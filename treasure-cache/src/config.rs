//! Cache configuration types.

use crate::error::{CacheError, CacheResult};
use crate::filesystem::{FilesystemCache, FilesystemConfig};
use crate::memory::InMemoryCache;
use crate::traits::CacheBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Cache backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// In-process map
    Memory,
    /// One file per entry in a directory
    Filesystem,
    /// Redis server
    Redis,
}

impl FromStr for CacheBackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "faux" => Ok(Self::Memory),
            "filesystem" | "file" | "fs" => Ok(Self::Filesystem),
            "redis" => Ok(Self::Redis),
            other => Err(CacheError::Config(format!("Unknown cache backend: {}", other))),
        }
    }
}

impl std::fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "Memory"),
            Self::Filesystem => write!(f, "Filesystem"),
            Self::Redis => write!(f, "Redis"),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache backend type
    pub backend: CacheBackendKind,

    /// Directory for the filesystem backend
    pub dir: Option<PathBuf>,

    /// File name prefix for the filesystem backend
    pub file_prefix: String,

    /// Create the filesystem directory when missing
    pub create_directories: bool,

    /// Connection URL for networked backends
    pub url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            dir: None,
            file_prefix: "cache_".to_string(),
            create_directories: false,
            url: None,
        }
    }
}

impl CacheConfig {
    /// In-memory cache configuration.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Filesystem cache configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use treasure_cache::CacheConfig;
    ///
    /// let config = CacheConfig::filesystem("/var/cache/app").with_file_prefix("app_");
    /// assert_eq!(config.file_prefix, "app_");
    /// ```
    pub fn filesystem(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: CacheBackendKind::Filesystem,
            dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Redis cache configuration.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: CacheBackendKind::Redis,
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `TREASURE_CACHE_BACKEND`, `TREASURE_CACHE_DIR`,
    /// `TREASURE_CACHE_FILE_PREFIX` and `TREASURE_CACHE_URL`.
    pub fn from_env() -> CacheResult<Self> {
        let mut config = match std::env::var("TREASURE_CACHE_BACKEND") {
            Ok(backend) => Self {
                backend: backend.parse()?,
                ..Default::default()
            },
            Err(_) => Self::default(),
        };

        if let Ok(dir) = std::env::var("TREASURE_CACHE_DIR") {
            config.dir = Some(PathBuf::from(dir));
        }

        if let Ok(prefix) = std::env::var("TREASURE_CACHE_FILE_PREFIX") {
            config.file_prefix = prefix;
        }

        if let Ok(url) = std::env::var("TREASURE_CACHE_URL") {
            config.url = Some(url);
        }

        Ok(config)
    }

    /// Set the file name prefix.
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Create the filesystem directory when missing.
    pub fn with_create_directories(mut self, create: bool) -> Self {
        self.create_directories = create;
        self
    }

    /// Filesystem settings derived from this configuration.
    pub fn filesystem_config(&self) -> CacheResult<FilesystemConfig> {
        let dir = self.dir.clone().ok_or_else(|| {
            CacheError::Config("Filesystem backend requires a directory".to_string())
        })?;

        Ok(FilesystemConfig::new(dir)
            .with_file_prefix(self.file_prefix.clone())
            .with_create_directories(self.create_directories))
    }
}

/// Build the backend a configuration describes.
///
/// # Examples
///
/// ```no_run
/// use treasure_cache::*;
///
/// # async fn example() -> CacheResult<()> {
/// let backend = open_backend(&CacheConfig::filesystem("/tmp/cache")).await?;
/// backend.store("greeting", "hello".into(), None).await?;
/// # Ok(())
/// # }
/// ```
pub async fn open_backend(config: &CacheConfig) -> CacheResult<Arc<dyn CacheBackend>> {
    match config.backend {
        CacheBackendKind::Memory => Ok(Arc::new(InMemoryCache::new())),
        CacheBackendKind::Filesystem => {
            let cache = FilesystemCache::new(config.filesystem_config()?).await?;
            Ok(Arc::new(cache))
        }
        #[cfg(feature = "redis")]
        CacheBackendKind::Redis => {
            let cache = crate::redis_cache::RedisCache::new(config.clone()).await?;
            Ok(Arc::new(cache))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackendKind::Redis => Err(CacheError::Config(
            "Redis backend requires the `redis` feature".to_string(),
        )),
    }
}
