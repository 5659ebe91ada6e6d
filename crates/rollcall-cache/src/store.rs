//! Ephemeral store trait

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheResult;

/// Keyed set/counter operations with per-key expiry.
///
/// Every operation is atomic per key: concurrent set-adds against the same
/// key never lose members.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Add a member to the set at `key`; creates the set if absent
    async fn sadd(&self, key: &str, member: &str) -> CacheResult<()>;

    /// Cardinality of the set at `key` (0 if absent or expired)
    async fn scard(&self, key: &str) -> CacheResult<usize>;

    /// Members of the set at `key` (empty if absent or expired)
    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>>;

    /// Increment the counter at `key`, returning the new value
    async fn incr(&self, key: &str) -> CacheResult<i64>;

    /// String value at `key`, if any
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// (Re)apply a time-to-live to `key`
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()>;
}
