//! Cache backends for Treasure Chest.
//!
//! Defines the [`CacheBackend`] contract that the namespace layer is built
//! on, together with the backends that implement it.
//!
//! # Features
//!
//! - `redis` - Enable the Redis backend
//! - **In-memory backend** - [`InMemoryCache`], for tests and single processes
//! - **Filesystem backend** - [`FilesystemCache`], one file per entry with
//!   lock-protected atomic counters, safe across processes
//!
//! # Examples
//!
//! ## Filesystem Cache
//!
//! ```no_run
//! use treasure_cache::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CacheError> {
//!     let cache = FilesystemCache::with_dir("/tmp").await?;
//!
//!     cache.store("surname", "baggins".into(), Some(Duration::from_secs(60))).await?;
//!     cache.add("visits", 0i64.into(), None).await?;
//!     let visits = cache.increment("visits", 1).await?;
//!     assert_eq!(visits, 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Choosing a Backend from Configuration
//!
//! ```no_run
//! use treasure_cache::*;
//!
//! # async fn example() -> Result<(), CacheError> {
//! let config = CacheConfig::from_env()?;
//! let backend = open_backend(&config).await?;
//! let hit = backend.fetch("user:123").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod filesystem;
pub mod helpers;
pub mod memory;
pub mod traits;
pub mod value;

#[cfg(feature = "redis")]
pub mod redis_cache;

pub use config::{CacheBackendKind, CacheConfig, open_backend};
pub use error::{CacheError, CacheResult};
pub use filesystem::{FilesystemCache, FilesystemConfig};
pub use helpers::*;
pub use memory::InMemoryCache;
pub use traits::CacheBackend;
pub use value::CacheValue;

#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{CacheBackendKind, CacheConfig, open_backend};
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::filesystem::{FilesystemCache, FilesystemConfig};
    pub use crate::memory::InMemoryCache;
    pub use crate::traits::CacheBackend;
    pub use crate::value::CacheValue;

    #[cfg(feature = "redis")]
    pub use crate::redis_cache::RedisCache;
}
