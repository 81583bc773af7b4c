//! Profile composition subsystem.
//!
//! # Data Flow
//! ```text
//! build_profile(client, id)
//!     → rate limiter        (limited → 429, nothing else touched)
//!     → response cache      (hit → cached bytes verbatim)
//!     → user service        (retry; failure → 404, no fan-out)
//!     → spawn ┬ orders           (retry)
//!             ├ products         (retry)
//!             └ recommendations  (breaker → retry)
//!     → join barrier        (each failure degrades its own field to [])
//!     → serialize → detached cache write → payload
//! ```

pub mod aggregator;
pub mod types;

pub use aggregator::Aggregator;
pub use types::{PayloadSource, ProfilePayload, ProfileResponse};
