//! Per-client fixed-window rate limiting on the shared counter store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RateLimitConfig, WindowMode};
use crate::observability::metrics;
use crate::store::CounterStore;

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request may proceed. `count` is its position in the window, when known.
    Allowed { count: Option<u64> },
    /// Client exhausted its window.
    Limited { count: u64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Derive the rate limit identity from a peer address (port stripped).
pub fn client_identity(addr: &SocketAddr) -> String {
    addr.ip().to_string()
}

/// Counts requests per client inside a window held by the shared store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u64,
    window: Duration,
    mode: WindowMode,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: config.window(),
            mode: config.window_mode,
            enabled: config.enabled,
        }
    }

    fn key(client: &str) -> String {
        format!("ratelimit:{}", client)
    }

    /// Count one request for `client` and decide whether it is admitted.
    ///
    /// Store failures admit the request.
    pub async fn check(&self, client: &str) -> Admission {
        if !self.enabled {
            return Admission::Allowed { count: None };
        }

        let key = Self::key(client);
        let count = match self.store.incr(&key, self.window).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    client = %client,
                    error = %e,
                    "Rate limit store error, admitting request"
                );
                return Admission::Allowed { count: None };
            }
        };

        if self.mode == WindowMode::Renewing {
            if let Err(e) = self.store.expire(&key, self.window).await {
                tracing::warn!(client = %client, error = %e, "Failed to renew rate limit window");
            }
        }

        if count > self.max_requests {
            metrics::record_rate_limited();
            Admission::Limited { count }
        } else {
            Admission::Allowed { count: Some(count) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;

    fn limiter(mode: WindowMode) -> RateLimiter {
        let config = RateLimitConfig {
            window_mode: mode,
            ..RateLimitConfig::default()
        };
        RateLimiter::new(Arc::new(MemoryStore::new()), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_eleventh_request_in_window_is_limited() {
        let limiter = limiter(WindowMode::Fixed);

        for i in 1..=10 {
            assert_eq!(
                limiter.check("10.0.0.5").await,
                Admission::Allowed { count: Some(i) }
            );
        }
        assert_eq!(limiter.check("10.0.0.5").await, Admission::Limited { count: 11 });

        // Other clients have their own window.
        assert!(limiter.check("10.0.0.6").await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_window_lapses() {
        let limiter = limiter(WindowMode::Fixed);

        for _ in 0..11 {
            limiter.check("10.0.0.5").await;
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!limiter.check("10.0.0.5").await.is_allowed());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(
            limiter.check("10.0.0.5").await,
            Admission::Allowed { count: Some(1) }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewing_window_extends_under_traffic() {
        let limiter = limiter(WindowMode::Renewing);

        for _ in 0..11 {
            limiter.check("10.0.0.5").await;
        }
        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(!limiter.check("10.0.0.5").await.is_allowed());

        // 61s after the first request, but only 11s after the last one.
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!limiter.check("10.0.0.5").await.is_allowed());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("10.0.0.5").await.is_allowed());
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        struct DownStore;

        #[async_trait]
        impl CounterStore for DownStore {
            async fn incr(&self, _key: &str, _ttl: Duration) -> StoreResult<u64> {
                Err(StoreError::Unavailable("timeout".into()))
            }
            async fn expire(&self, _key: &str, _ttl: Duration) -> StoreResult<()> {
                Err(StoreError::Unavailable("timeout".into()))
            }
            async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
                Ok(None)
            }
            async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> StoreResult<()> {
                Ok(())
            }
        }

        let limiter = RateLimiter::new(Arc::new(DownStore), &RateLimitConfig::default());
        for _ in 0..20 {
            assert_eq!(
                limiter.check("10.0.0.5").await,
                Admission::Allowed { count: None }
            );
        }
    }

    #[tokio::test]
    async fn test_disabled_limiter_admits_everything() {
        let config = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), &config);
        for _ in 0..20 {
            assert!(limiter.check("10.0.0.5").await.is_allowed());
        }
    }

    #[test]
    fn test_client_identity_strips_port() {
        let v4: SocketAddr = "10.0.0.5:52344".parse().unwrap();
        let v6: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(client_identity(&v4), "10.0.0.5");
        assert_eq!(client_identity(&v6), "::1");
    }
}
