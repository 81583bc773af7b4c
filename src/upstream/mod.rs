//! Downstream service clients.
//!
//! # Responsibilities
//! - Define the payload types of the user, order, product and recommendation services
//! - Fetch one payload per call with a fixed client-side timeout
//! - Classify failures (transport, status, decode)
//!
//! # Design Decisions
//! - One attempt per call; retries and breakers are applied by the aggregator
//! - The aggregator depends on the `ProfileUpstreams` trait, not on HTTP

pub mod client;
pub mod types;

pub use client::{HttpUpstreams, ProfileUpstreams, UpstreamError};
pub use types::{Order, Product, User};
