//! Namespaced cache configuration.

use crate::error::{ChestError, ChestResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default namespace delimiter.
pub const DEFAULT_DELIMITER: char = ':';

/// Default prefix of namespace version counter keys.
pub const DEFAULT_VERSION_PREFIX: &str = "ns";

/// Configuration for [`NamespacedCache`](crate::NamespacedCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestConfig {
    /// Global prefix put in front of every key and namespace
    pub prefix: Option<String>,

    /// Character separating namespaces from each other and from the key
    pub delimiter: char,

    /// Prefix of the keys that hold namespace version counters
    pub version_prefix: String,

    /// TTL for data writes that pass none. Version counters never expire.
    pub default_ttl: Option<Duration>,
}

impl Default for ChestConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            delimiter: DEFAULT_DELIMITER,
            version_prefix: DEFAULT_VERSION_PREFIX.to_string(),
            default_ttl: None,
        }
    }
}

impl ChestConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `TREASURE_PREFIX`, `TREASURE_DELIMITER`,
    /// `TREASURE_VERSION_PREFIX` and `TREASURE_DEFAULT_TTL` (seconds). A
    /// delimiter that is not exactly one character is a configuration error.
    pub fn from_env() -> ChestResult<Self> {
        let mut config = Self::default();

        if let Ok(prefix) = std::env::var("TREASURE_PREFIX") {
            config = config.with_prefix(prefix);
        }

        if let Ok(delimiter) = std::env::var("TREASURE_DELIMITER") {
            config.delimiter = parse_delimiter(&delimiter)?;
        }

        if let Ok(version_prefix) = std::env::var("TREASURE_VERSION_PREFIX") {
            config.version_prefix = version_prefix;
        }

        if let Ok(ttl) = std::env::var("TREASURE_DEFAULT_TTL") {
            let seconds: u64 = ttl.parse().map_err(|_| {
                ChestError::Config(format!("TREASURE_DEFAULT_TTL is not a number: {}", ttl))
            })?;
            config.default_ttl = Some(Duration::from_secs(seconds));
        }

        Ok(config)
    }

    /// Set the global key prefix. An empty prefix disables prefixing.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Set the delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the version counter key prefix.
    pub fn with_version_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.version_prefix = prefix.into();
        self
    }

    /// Set the TTL used for data writes that pass none.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }
}

/// Validate a delimiter string, which must hold exactly one character.
pub fn parse_delimiter(delimiter: &str) -> ChestResult<char> {
    let mut chars = delimiter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ChestError::Config(format!(
            "Cache delimiter must be exactly one character, got {:?}",
            delimiter
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChestConfig::new();
        assert_eq!(config.prefix, None);
        assert_eq!(config.delimiter, ':');
        assert_eq!(config.version_prefix, "ns");
    }

    #[test]
    fn test_config_builder() {
        let config = ChestConfig::new()
            .with_prefix("app")
            .with_delimiter('/')
            .with_version_prefix("v")
            .with_default_ttl(Duration::from_secs(300));

        assert_eq!(config.prefix.as_deref(), Some("app"));
        assert_eq!(config.delimiter, '/');
        assert_eq!(config.version_prefix, "v");
        assert_eq!(config.default_ttl, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_empty_prefix_disables_prefixing() {
        let config = ChestConfig::new().with_prefix("app").with_prefix("");
        assert_eq!(config.prefix, None);
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(":").unwrap(), ':');
        assert_eq!(parse_delimiter("|").unwrap(), '|');
        assert_eq!(parse_delimiter("é").unwrap(), 'é');
        assert!(parse_delimiter("").unwrap_err().is_config());
        assert!(parse_delimiter("::").unwrap_err().is_config());
    }
}
