//! Namespaced keys with O(1) invalidation for Treasure Chest.
//!
//! Keys are grouped into hierarchical namespaces separated by a delimiter
//! (`:` by default). Invalidating a namespace hides every key below it,
//! nested namespaces included, with a single counter update in the backend.
//!
//! # Features
//!
//! - **Namespace versioning** - every namespace level owns a version counter
//! - **Global prefix** - share one backend between applications
//! - **Pluggable key mapping** - swap in a custom [`KeyMapper`]
//! - **Named operations** - dispatch by operation name with [`NamespacedCache::call`]
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use treasure_cache::FilesystemCache;
//! use treasure_keymap::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ChestError> {
//!     let backend = FilesystemCache::with_dir("/tmp/treasure").await?;
//!     let config = ChestConfig::new().with_prefix("shop");
//!     let cache = NamespacedCache::with_config(Arc::new(backend), config);
//!
//!     cache.store("catalogue:shirts:product:title", "Mithril vest", None).await?;
//!
//!     // Every shirt product is gone, the rest of the catalogue stays
//!     cache.invalidate("catalogue:shirts").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mapper;
pub mod namespaced;
pub mod operation;

pub use config::{ChestConfig, DEFAULT_DELIMITER, DEFAULT_VERSION_PREFIX, parse_delimiter};
pub use error::{ChestError, ChestResult};
pub use mapper::{KeyMapper, VersionedKeyMapper};
pub use namespaced::NamespacedCache;
pub use operation::{CallArgs, CallOutcome, Operation};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ChestConfig;
    pub use crate::error::{ChestError, ChestResult};
    pub use crate::mapper::{KeyMapper, VersionedKeyMapper};
    pub use crate::namespaced::NamespacedCache;
    pub use crate::operation::{CallArgs, CallOutcome, Operation};
}
