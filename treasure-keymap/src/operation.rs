//! Named cache operations for dynamic dispatch.
//!
//! [`NamespacedCache::call`](crate::NamespacedCache::call) accepts an
//! operation name, typically coming from configuration or a command line.
//! Names are parsed into [`Operation`] at the boundary, so a typo fails
//! with [`ChestError::UnknownOperation`] instead of reaching the backend.

use crate::error::ChestError;
use std::str::FromStr;
use std::time::Duration;
use treasure_cache::CacheValue;

/// The recognized set of cache operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Store only if absent
    Add,
    /// Store unconditionally
    Store,
    /// Store only if present
    Replace,
    /// Check for a live entry
    Exists,
    /// Read an entry
    Fetch,
    /// Atomic increment
    Inc,
    /// Atomic decrement
    Dec,
    /// Remove an entry
    Delete,
    /// Remove everything
    Clear,
}

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Operation; 9] = [
        Operation::Add,
        Operation::Store,
        Operation::Replace,
        Operation::Exists,
        Operation::Fetch,
        Operation::Inc,
        Operation::Dec,
        Operation::Delete,
        Operation::Clear,
    ];

    /// Canonical operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Store => "store",
            Operation::Replace => "replace",
            Operation::Exists => "exists",
            Operation::Fetch => "fetch",
            Operation::Inc => "inc",
            Operation::Dec => "dec",
            Operation::Delete => "delete",
            Operation::Clear => "clear",
        }
    }

    /// Whether the operation addresses a single key.
    pub fn takes_key(&self) -> bool {
        !matches!(self, Operation::Clear)
    }
}

impl FromStr for Operation {
    type Err = ChestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Operation::Add),
            "store" => Ok(Operation::Store),
            "replace" => Ok(Operation::Replace),
            "exists" => Ok(Operation::Exists),
            "fetch" => Ok(Operation::Fetch),
            "inc" | "increment" => Ok(Operation::Inc),
            "dec" | "decrement" => Ok(Operation::Dec),
            "delete" => Ok(Operation::Delete),
            "clear" => Ok(Operation::Clear),
            other => Err(ChestError::UnknownOperation(other.to_string())),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments for a dynamically dispatched operation.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    /// Caller key, before prefixing and mapping
    pub key: Option<String>,
    /// Value for add/store/replace
    pub value: Option<CacheValue>,
    /// Time-to-live for add/store/replace
    pub ttl: Option<Duration>,
    /// Step for inc/dec (defaults to 1)
    pub step: Option<i64>,
}

impl CallArgs {
    /// Arguments addressing a key.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Set the value.
    pub fn with_value(mut self, value: impl Into<CacheValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the step.
    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }
}

/// Result of a dynamically dispatched operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// add, store, replace, exists, delete
    Bool(bool),
    /// fetch
    Value(Option<CacheValue>),
    /// inc, dec
    Counter(i64),
    /// clear
    Done,
}
