// Treasure Chest - a cache with hierarchical namespaces
//
// This library ties the cache backends to the namespace layer, so keys can be
// grouped and whole groups invalidated with a single counter update.

// Re-export the namespace layer
pub use treasure_keymap::*;

// Re-export the backends
pub use treasure_cache;
pub use treasure_cache::{
    CacheBackend, CacheBackendKind, CacheConfig, CacheError, CacheResult, CacheValue,
    FilesystemCache, FilesystemConfig, InMemoryCache, open_backend,
};

#[cfg(feature = "redis")]
pub use treasure_cache::RedisCache;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        CacheBackend,
        CacheConfig,
        CacheError,
        CacheValue,
        CallArgs,
        CallOutcome,
        ChestConfig,
        ChestError,
        ChestResult,
        FilesystemCache,
        InMemoryCache,
        KeyMapper,
        NamespacedCache,
        Operation,
        VersionedKeyMapper,
    };

    #[cfg(feature = "redis")]
    pub use crate::RedisCache;
}
