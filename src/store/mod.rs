//! Shared counter/key-value store.
//!
//! # Data Flow
//! ```text
//! security::rate_limit  → incr(ratelimit:<ip>, window) [+ expire]
//! cache::response       → get(profile:<id>) / set(profile:<id>, bytes, ttl)
//!                               │
//!                               ▼
//!                     Arc<dyn CounterStore>
//!                               │
//!                               ▼
//!                  memory.rs (DashMap, TTL-aware)
//! ```
//!
//! # Design Decisions
//! - The gateway never caches store state locally; every check goes to the store
//! - Callers treat every `StoreError` as "feature unavailable", never as a request failure
//! - Expiries use Tokio's clock so paused-time tests drive TTLs deterministically

pub mod memory;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use memory::MemoryStore;

/// Errors raised by a counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the command.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The key holds a value of a different kind than the command expects.
    #[error("key '{0}' holds the wrong kind of value")]
    WrongType(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Atomic counters and TTL-bounded blobs keyed by arbitrary strings.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter at `key` and return its new value.
    ///
    /// A missing or expired key starts at 1 and expires after `ttl`.
    /// The expiry of a live key is left untouched.
    async fn incr(&self, key: &str, ttl: Duration) -> StoreResult<u64>;

    /// Reset the expiry of a live key to `ttl` from now. Missing keys are ignored.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    /// Read a blob, `None` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write a blob that expires after `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;
}
