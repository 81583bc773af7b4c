//! Cache-aside storage of serialized profile responses.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::CacheConfig;
use crate::observability::metrics;
use crate::store::{CounterStore, StoreResult};

/// Cache of serialized responses keyed by profile id.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CounterStore>,
    ttl: Duration,
    prefix: String,
    enabled: bool,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CounterStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl(),
            prefix: config.key_prefix.clone(),
            enabled: config.enabled,
        }
    }

    /// Store key for a profile id.
    pub fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// Look up a cached payload.
    ///
    /// Store errors are reported as a miss.
    pub async fn lookup(&self, id: &str) -> Option<Vec<u8>> {
        if !self.enabled {
            return None;
        }

        let found = match self.store.get(&self.key(id)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(user_id = %id, error = %e, "Cache read failed, treating as miss");
                None
            }
        };
        metrics::record_cache_lookup(found.is_some());
        found
    }

    /// Write a payload and wait for the store to acknowledge it.
    pub async fn store(&self, id: &str, payload: Vec<u8>) -> StoreResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.store.set(&self.key(id), payload, self.ttl).await
    }

    /// Write a payload on a background task.
    ///
    /// Nobody waits on the returned handle in the request path: a failure is
    /// only logged, and a request arriving before the write lands misses again.
    pub fn store_detached(&self, id: &str, payload: Vec<u8>) -> JoinHandle<()> {
        let cache = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = cache.store(&id, payload).await {
                tracing::warn!(user_id = %id, error = %e, "Cache write failed");
            }
        })
    }
}
