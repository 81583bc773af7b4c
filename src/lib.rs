//! Profile gateway library.
//!
//! Composes a single profile document from a user service (mandatory) and
//! order, product and recommendation services (optional), behind a shared
//! rate limiter and a cache-aside response cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod profile;
pub mod resilience;
pub mod security;
pub mod store;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
