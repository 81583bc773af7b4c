//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming profile request:
//!     → auth.rs (bearer token, when enabled)
//!     → handler derives client identity from the peer address
//!     → rate_limit.rs (per-client window on the shared store)
//!     → cache / upstream fan-out
//! ```
//!
//! # Design Decisions
//! - Auth fails closed: missing or wrong token is a 401
//! - Rate limiting fails open: a store outage admits the request

pub mod auth;
pub mod rate_limit;

pub use rate_limit::{client_identity, Admission, RateLimiter};
