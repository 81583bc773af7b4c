//! HTTP client for the profile's downstream services.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::upstream::types::{Order, Product, User};

/// Errors from a single downstream call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("bad status code: {0}")]
    Status(u16),

    /// Body was not the expected JSON.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configured base URL is unusable.
    #[error("invalid upstream url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl UpstreamError {
    /// Transport failures and 5xx responses.
    pub fn is_server_side(&self) -> bool {
        match self {
            UpstreamError::Transport(_) => true,
            UpstreamError::Status(status) => *status >= 500,
            _ => false,
        }
    }
}

/// The downstream services a profile is composed from.
///
/// Each method performs exactly one attempt.
#[async_trait]
pub trait ProfileUpstreams: Send + Sync {
    /// Mandatory: the user record.
    async fn fetch_user(&self, id: &str) -> Result<User, UpstreamError>;

    async fn fetch_orders(&self, id: &str) -> Result<Vec<Order>, UpstreamError>;

    async fn fetch_products(&self) -> Result<Vec<Product>, UpstreamError>;

    async fn fetch_recommendations(&self, id: &str) -> Result<Vec<Product>, UpstreamError>;
}

/// `ProfileUpstreams` over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpUpstreams {
    client: reqwest::Client,
    user_url: Url,
    order_url: Url,
    product_url: Url,
    recommendation_url: Url,
}

impl HttpUpstreams {
    pub fn new(
        upstreams: &UpstreamConfig,
        timeouts: &TimeoutConfig,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeouts.upstream())
            .build()?;

        Ok(Self {
            client,
            user_url: parse_base(&upstreams.user_url)?,
            order_url: parse_base(&upstreams.order_url)?,
            product_url: parse_base(&upstreams.product_url)?,
            recommendation_url: parse_base(&upstreams.recommendation_url)?,
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, UpstreamError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// A JSON `null` list decodes to an empty one.
    async fn fetch_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, UpstreamError> {
        let list: Option<Vec<T>> = self.fetch_json(url).await?;
        Ok(list.unwrap_or_default())
    }
}

fn parse_base(raw: &str) -> Result<Url, UpstreamError> {
    let url = Url::parse(raw).map_err(|e| UpstreamError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(UpstreamError::InvalidUrl {
            url: raw.to_string(),
            reason: "cannot be a base".to_string(),
        });
    }
    Ok(url)
}

/// Append percent-encoded path segments to a base URL.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

#[async_trait]
impl ProfileUpstreams for HttpUpstreams {
    async fn fetch_user(&self, id: &str) -> Result<User, UpstreamError> {
        self.fetch_json(endpoint(&self.user_url, &["users", id])).await
    }

    async fn fetch_orders(&self, id: &str) -> Result<Vec<Order>, UpstreamError> {
        self.fetch_list(endpoint(&self.order_url, &["orders", "user", id]))
            .await
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, UpstreamError> {
        self.fetch_list(endpoint(&self.product_url, &["products"])).await
    }

    async fn fetch_recommendations(&self, id: &str) -> Result<Vec<Product>, UpstreamError> {
        self.fetch_list(endpoint(&self.recommendation_url, &["recommendations", id]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn upstreams_at(base: &str) -> HttpUpstreams {
        let config = UpstreamConfig {
            user_url: base.to_string(),
            order_url: base.to_string(),
            product_url: format!("{}/", base),
            recommendation_url: base.to_string(),
        };
        HttpUpstreams::new(&config, &TimeoutConfig::default()).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let base = Url::parse("http://users:8081/").unwrap();
        assert_eq!(
            endpoint(&base, &["users", "a/b c"]).as_str(),
            "http://users:8081/users/a%2Fb%20c"
        );

        let prefixed = Url::parse("http://gw/api").unwrap();
        assert_eq!(
            endpoint(&prefixed, &["orders", "user", "42"]).as_str(),
            "http://gw/api/orders/user/42"
        );
    }

    #[tokio::test]
    async fn test_fetches_typed_payloads() {
        let app = Router::new()
            .route(
                "/users/{id}",
                get(|Path(id): Path<String>| async move {
                    Json(json!({"id": id, "name": "A", "email": "a@x.com"}))
                }),
            )
            .route(
                "/orders/user/{id}",
                get(|| async { Json(json!([{"id": "o1", "amount": 9.5, "status": "paid"}])) }),
            )
            .route("/products", get(|| async { Json(json!(null)) }));
        let upstreams = upstreams_at(&serve(app).await);

        let user = upstreams.fetch_user("42").await.unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.email, "a@x.com");

        let orders = upstreams.fetch_orders("42").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, "paid");

        assert!(upstreams.fetch_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_classifies_failures() {
        let app = Router::new()
            .route(
                "/users/{id}",
                get(|| async { (StatusCode::NOT_FOUND, "no such user") }),
            )
            .route(
                "/recommendations/{id}",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
            )
            .route("/products", get(|| async { "not json" }));
        let upstreams = upstreams_at(&serve(app).await);

        let err = upstreams.fetch_user("1").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(404)));
        assert!(!err.is_server_side());

        let err = upstreams.fetch_recommendations("1").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(503)));
        assert!(err.is_server_side());

        let err = upstreams.fetch_products().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = upstreams_at(&base).fetch_user("1").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
        assert!(err.is_server_side());
    }

    #[test]
    fn test_rejects_unusable_base() {
        let config = UpstreamConfig {
            user_url: "mailto:someone@example.com".into(),
            ..UpstreamConfig::default()
        };
        let err = HttpUpstreams::new(&config, &TimeoutConfig::default()).unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidUrl { .. }));
    }
}
