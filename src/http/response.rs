//! Mapping of gateway errors to client responses.
//!
//! # Design Decisions
//! - One coarse error per request; absorbed optional failures never show up here
//! - Mandatory dependency failures surface as 404 whatever the underlying cause

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::NOT_FOUND,
            GatewayError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            GatewayError::RateLimited { .. } => (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error": "Too many requests"}"#,
            )
                .into_response(),
            GatewayError::UpstreamUnavailable { .. } => {
                (status, "User not found or service unavailable").into_response()
            }
            GatewayError::Serialization(_) => (status, "Internal Server Error").into_response(),
        }
    }
}

/// JSON body with the right content type.
pub fn json_body(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
