//! Shared utilities for integration testing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use profile_gateway::config::GatewayConfig;
use profile_gateway::store::{CounterStore, MemoryStore};
use profile_gateway::upstream::HttpUpstreams;
use profile_gateway::{GatewayServer, Shutdown};

/// Call counter and failure switches for one stub service.
#[derive(Default)]
pub struct Service {
    calls: AtomicU32,
    down: AtomicBool,
    hang_first: AtomicU32,
}

impl Service {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Never answer the first `n` calls.
    pub fn hang_first(&self, n: u32) {
        self.hang_first.store(n, Ordering::SeqCst);
    }

    /// Count the call; `Some` carries the 503 to answer with.
    async fn hit(&self) -> Option<Response> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.hang_first.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.down.load(Ordering::SeqCst) {
            Some((StatusCode::SERVICE_UNAVAILABLE, "down").into_response())
        } else {
            None
        }
    }
}

/// The four downstream services, served from one listener.
#[derive(Default)]
pub struct Upstreams {
    pub users: Service,
    pub orders: Service,
    pub products: Service,
    pub recommendations: Service,
}

impl Upstreams {
    pub fn optional_calls(&self) -> u32 {
        self.orders.calls() + self.products.calls() + self.recommendations.calls()
    }
}

async fn user(State(up): State<Arc<Upstreams>>, Path(id): Path<String>) -> Response {
    if let Some(failure) = up.users.hit().await {
        return failure;
    }
    Json(json!({"id": id, "name": "Ivan Ivanov", "email": "ivan@test.com"})).into_response()
}

async fn orders(State(up): State<Arc<Upstreams>>, Path(id): Path<String>) -> Response {
    if let Some(failure) = up.orders.hit().await {
        return failure;
    }
    Json(json!([{"id": format!("{}-o1", id), "amount": 1289.5, "status": "delivered"}]))
        .into_response()
}

async fn products(State(up): State<Arc<Upstreams>>) -> Response {
    if let Some(failure) = up.products.hit().await {
        return failure;
    }
    Json(json!([
        {"id": "p1", "name": "Laptop", "price": 1200.0},
        {"id": "p2", "name": "Headphones", "price": 199.9}
    ]))
    .into_response()
}

async fn recommendations(State(up): State<Arc<Upstreams>>) -> Response {
    if let Some(failure) = up.recommendations.hit().await {
        return failure;
    }
    Json(json!([{"id": "p2", "name": "Headphones", "price": 199.9}])).into_response()
}

/// Start the stub services on an ephemeral port. Returns their base URL.
pub async fn start_upstreams(upstreams: Arc<Upstreams>) -> String {
    let app = Router::new()
        .route("/users/{id}", get(user))
        .route("/orders/user/{id}", get(orders))
        .route("/products", get(products))
        .route("/recommendations/{id}", get(recommendations))
        .with_state(upstreams);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Config pointing every upstream at `base`, with short retry delays.
pub fn test_config(base: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstreams.user_url = base.to_string();
    config.upstreams.order_url = base.to_string();
    config.upstreams.product_url = base.to_string();
    config.upstreams.recommendation_url = base.to_string();
    config.retries.delay_ms = 10;
    config.timeouts.upstream_secs = 2;
    config.observability.metrics_enabled = false;
    config
}

/// A running gateway and the handles a test inspects.
pub struct Gateway {
    pub addr: SocketAddr,
    pub store: MemoryStore,
    pub shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait for the detached cache write of `key` to land.
    pub async fn wait_for_cached(&self, key: &str) {
        for _ in 0..100 {
            if self.store.contains(key) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} was never cached", key);
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let store = MemoryStore::new();
    let upstreams = HttpUpstreams::new(&config.upstreams, &config.timeouts).unwrap();
    let shared: Arc<dyn CounterStore> = Arc::new(store.clone());
    let server = GatewayServer::with_parts(config, Arc::new(upstreams), shared);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    Gateway {
        addr,
        store,
        shutdown,
    }
}
