//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Optional downstream call (recommendations):
//!     → circuit_breaker.rs (admit, short-circuit, or probe)
//!     → retries.rs (fixed-delay bounded attempts)
//!     → upstream client (fixed client-side timeout)
//!
//! Mandatory and other optional calls:
//!     → retries.rs → upstream client
//! ```
//!
//! # Design Decisions
//! - The breaker wraps the whole retry sequence, so an open breaker also
//!   skips the retry delays
//! - Breaker rejections are distinct errors and never reach the dependency
//! - State is per dependency; unrelated breakers never contend

pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::{BreakerError, BreakerState, CircuitBreaker};
pub use retries::{RetriesExhausted, RetryPolicy};
