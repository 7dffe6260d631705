//! Backing-store seam.
//!
//! The engine is written against the small set of atomic single-key
//! primitives below (counters, conditional expiring markers, hashes,
//! ordered sets) plus three multi-key batched reads. Per-key atomicity is
//! the only guarantee: multi-key sequences in the engine are ordered
//! series of independent calls, never cross-key transactions.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use ::std::collections::HashMap;

use crate::error::StoreError;

pub type StoreResult<T> = ::std::result::Result<T, StoreError>;

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // -- plain keys --
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    /// Set with an expiry in seconds, replacing any previous value.
    async fn setex(&self, key: &str, ttl_secs: i64, value: &str) -> StoreResult<()>;
    async fn del(&self, key: &str) -> StoreResult<()>;
    async fn exists(&self, key: &str) -> StoreResult<bool>;
    /// Atomic counter increment; missing keys start at zero.
    async fn incr(&self, key: &str) -> StoreResult<i64>;
    /// Remaining lifetime in seconds: -2 if the key is missing, -1 if it
    /// has no expiry.
    async fn ttl(&self, key: &str) -> StoreResult<i64>;

    // -- hashes --
    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;
    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>>;
    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()>;
    /// Atomic hash-field increment; missing fields start at zero.
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    // -- ordered sets --
    /// Insert or update a member. Returns true only when the member was
    /// newly added (an update of the score returns false).
    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<bool>;
    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool>;
    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;
    async fn zcard(&self, key: &str) -> StoreResult<u64>;
    /// Members ordered by ascending score, inclusive index range with
    /// negative-from-the-end semantics.
    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;
    /// Members ordered by descending score, same index semantics.
    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    // -- batched reads: one round trip each, regardless of fan-out --
    async fn hgetall_multi(&self, keys: &[String]) -> StoreResult<Vec<HashMap<String, String>>>;
    async fn hget_multi(&self, pairs: &[(String, String)]) -> StoreResult<Vec<Option<String>>>;
    async fn zscore_multi(&self, pairs: &[(String, String)]) -> StoreResult<Vec<Option<f64>>>;
}
