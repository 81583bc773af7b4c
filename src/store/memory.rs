//! In-process store backed by a concurrent map.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::store::{CounterStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Value {
    Counter(u64),
    Blob(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Instant,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// How often `run_sweeper` drops expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// A thread-safe store with per-key expiry.
///
/// Reads never see expired entries. Memory is reclaimed by `purge_expired`,
/// which `run_sweeper` calls periodically.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Slot>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no live key remains.
    pub fn is_empty(&self) -> bool {
        let now = Instant::now();
        !self.inner.iter().any(|r| r.value().is_live(now))
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, slot| slot.is_live(now));
        before.saturating_sub(self.inner.len())
    }

    /// Purge expired entries every `period` until `shutdown` fires.
    pub async fn run_sweeper(self, period: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        tracing::debug!(
                            removed,
                            remaining = self.inner.len(),
                            "Swept expired keys"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Store sweeper stopping");
                    break;
                }
            }
        }
    }

    /// Whether a live key exists.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .get(key)
            .map(|r| r.value().is_live(now))
            .unwrap_or(false)
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn incr(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        let now = Instant::now();
        match self.inner.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if !slot.is_live(now) {
                    *slot = Slot {
                        value: Value::Counter(1),
                        expires_at: now + ttl,
                    };
                    return Ok(1);
                }
                match &mut slot.value {
                    Value::Counter(count) => {
                        *count += 1;
                        Ok(*count)
                    }
                    Value::Blob(_) => Err(StoreError::WrongType(key.to_string())),
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value: Value::Counter(1),
                    expires_at: now + ttl,
                });
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        if let Some(mut slot) = self.inner.get_mut(key) {
            if slot.is_live(now) {
                slot.expires_at = now + ttl;
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let found = match self.inner.get(key) {
            Some(slot) if slot.is_live(now) => match &slot.value {
                Value::Blob(bytes) => Some(bytes.clone()),
                Value::Counter(_) => return Err(StoreError::WrongType(key.to_string())),
            },
            Some(_) => None,
            None => return Ok(None),
        };

        if found.is_none() {
            self.inner.remove_if(key, |_, slot| !slot.is_live(now));
        }
        Ok(found)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.inner.insert(
            key.to_string(),
            Slot {
                value: Value::Blob(value),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}
