//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the subsystems (limiter, cache, breaker, upstream client) on a shared store
//! - Create Axum Router with the profile and health handlers
//! - Wire up middleware (request ID, tracing, timeout, optional auth)
//! - Serve with peer addresses so the rate limiter can identify clients

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderName,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::ResponseCache;
use crate::config::GatewayConfig;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::http::response::json_body;
use crate::observability::metrics;
use crate::profile::Aggregator;
use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::security::auth::bearer_auth_middleware;
use crate::security::{client_identity, RateLimiter};
use crate::store::CounterStore;
use crate::upstream::{HttpUpstreams, ProfileUpstreams, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
}

/// HTTP server for the profile gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a server talking HTTP to the configured upstreams.
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn CounterStore>,
    ) -> Result<Self, UpstreamError> {
        let upstreams = Arc::new(HttpUpstreams::new(&config.upstreams, &config.timeouts)?);
        Ok(Self::with_parts(config, upstreams, store))
    }

    /// Create a server from explicit collaborators.
    pub fn with_parts(
        config: GatewayConfig,
        upstreams: Arc<dyn ProfileUpstreams>,
        store: Arc<dyn CounterStore>,
    ) -> Self {
        let recommendations_breaker = Arc::new(CircuitBreaker::from_config(
            "recommendations",
            &config.breaker,
        ));

        let aggregator = Aggregator::new(
            upstreams,
            RateLimiter::new(store.clone(), &config.rate_limit),
            ResponseCache::new(store, &config.cache),
            RetryPolicy::from_config(&config.retries),
            recommendations_breaker,
        );

        let router = Self::build_router(&config, AppState { aggregator });
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut profile = Router::new().route("/api/profile/{id}", get(profile_handler));
        if config.auth.enabled {
            profile = profile.route_layer(middleware::from_fn_with_state(
                Arc::new(config.auth.clone()),
                bearer_auth_middleware,
            ));
        }

        let request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .merge(profile)
            .route("/healthz", get(health_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            auth = self.config.auth.enabled,
            rate_limit = self.config.rate_limit.enabled,
            cache = self.config.cache.enabled,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Composite profile endpoint.
async fn profile_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(id): Path<String>,
) -> Response {
    let start = Instant::now();
    let client = client_identity(&addr);

    let response = match state.aggregator.build_profile(&client, &id).await {
        Ok(payload) => json_body(payload.body),
        Err(e) => e.into_response(),
    };

    metrics::record_request("GET", response.status().as_u16(), start);
    response
}

/// Liveness plus breaker state.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let breaker = state.aggregator.recommendations_breaker();
    Json(json!({
        "status": "ok",
        "breakers": { breaker.name(): breaker.state().as_str() },
    }))
}
