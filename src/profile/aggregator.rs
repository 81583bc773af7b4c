//! Fan-out/fan-in composition of the profile response.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;

use crate::cache::ResponseCache;
use crate::error::{GatewayError, GatewayResult};
use crate::profile::types::{PayloadSource, ProfilePayload, ProfileResponse};
use crate::observability::metrics;
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::security::{Admission, RateLimiter};
use crate::upstream::ProfileUpstreams;

/// Builds profiles from the downstream services.
///
/// Stateless between calls apart from the shared store behind the limiter
/// and cache, and the recommendation breaker.
#[derive(Clone)]
pub struct Aggregator {
    upstreams: Arc<dyn ProfileUpstreams>,
    limiter: RateLimiter,
    cache: ResponseCache,
    retry: RetryPolicy,
    recommendations_breaker: Arc<CircuitBreaker>,
}

impl Aggregator {
    pub fn new(
        upstreams: Arc<dyn ProfileUpstreams>,
        limiter: RateLimiter,
        cache: ResponseCache,
        retry: RetryPolicy,
        recommendations_breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            upstreams,
            limiter,
            cache,
            retry,
            recommendations_breaker,
        }
    }

    pub fn recommendations_breaker(&self) -> &CircuitBreaker {
        &self.recommendations_breaker
    }

    /// Produce the serialized profile for `id` on behalf of `client`.
    pub async fn build_profile(&self, client: &str, id: &str) -> GatewayResult<ProfilePayload> {
        if let Admission::Limited { count } = self.limiter.check(client).await {
            tracing::warn!(client = %client, count, "Rate limit exceeded");
            return Err(GatewayError::RateLimited {
                client: client.to_string(),
            });
        }

        let start = Instant::now();
        if let Some(body) = self.cache.lookup(id).await {
            tracing::info!(user_id = %id, duration = ?start.elapsed(), "Cache HIT");
            return Ok(ProfilePayload {
                body,
                source: PayloadSource::Cache,
            });
        }

        let user = match self.retry.run(|| self.upstreams.fetch_user(id)).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(user_id = %id, error = %e, "Failed to get user");
                return Err(GatewayError::UpstreamUnavailable {
                    id: id.to_string(),
                    source: e,
                });
            }
        };

        // Each unit owns its result slot; nothing is read before the join.
        let orders = {
            let upstreams = self.upstreams.clone();
            let retry = self.retry;
            let id = id.to_string();
            tokio::spawn(async move { retry.run(|| upstreams.fetch_orders(&id)).await })
        };
        let products = {
            let upstreams = self.upstreams.clone();
            let retry = self.retry;
            tokio::spawn(async move { retry.run(|| upstreams.fetch_products()).await })
        };
        let recommendations = {
            let upstreams = self.upstreams.clone();
            let retry = self.retry;
            let breaker = self.recommendations_breaker.clone();
            let id = id.to_string();
            tokio::spawn(async move {
                let (upstreams, id, retry) = (&upstreams, id.as_str(), &retry);
                breaker
                    .call(move || retry.run(move || upstreams.fetch_recommendations(id)))
                    .await
            })
        };

        let (orders, products, recommendations) = tokio::join!(orders, products, recommendations);

        let response = ProfileResponse {
            user,
            orders: degrade(id, "orders", orders),
            products: degrade(id, "products", products),
            recommendations: degrade(id, "recommendations", recommendations),
        };

        let body = serde_json::to_vec(&response).map_err(|e| {
            tracing::error!(user_id = %id, error = %e, "JSON marshal error");
            GatewayError::from(e)
        })?;

        // Fire-and-forget: a request racing this write may miss the cache again.
        drop(self.cache.store_detached(id, body.clone()));

        tracing::info!(user_id = %id, duration = ?start.elapsed(), "Request processed");
        Ok(ProfilePayload {
            body,
            source: PayloadSource::Upstreams,
        })
    }
}

/// Unwrap one fan-out slot, substituting `[]` for any failure.
fn degrade<T, E: fmt::Display>(
    id: &str,
    field: &'static str,
    joined: Result<Result<Vec<T>, E>, JoinError>,
) -> Vec<T> {
    match joined {
        Ok(Ok(items)) => items,
        Ok(Err(e)) => {
            if field == "recommendations" {
                tracing::warn!(user_id = %id, error = %e, "Recommendations fallback");
            } else {
                tracing::error!(user_id = %id, field, error = %e, "Optional dependency failed");
            }
            metrics::record_degraded(field);
            Vec::new()
        }
        Err(e) => {
            tracing::error!(user_id = %id, field, error = %e, "Fan-out task aborted");
            metrics::record_degraded(field);
            Vec::new()
        }
    }
}
