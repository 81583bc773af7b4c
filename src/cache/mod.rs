//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! profile request
//!     → response.rs get(id)       hit  → payload returned verbatim
//!                                 miss → aggregator computes profile
//!     → response.rs store_detached(id, payload)   (spawned, fire-and-forget)
//! ```
//!
//! # Design Decisions
//! - Cache-aside: read before any downstream call, write after the response is built
//! - Last write wins; no coherency between concurrent writers
//! - Store faults degrade to a miss (read) or a logged warning (write)

pub mod response;

pub use response::ResponseCache;
