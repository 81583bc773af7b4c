//! Composite profile document.

use serde::{Deserialize, Serialize};

use crate::upstream::types::{Order, Product, User};

/// The client-facing profile.
///
/// `user` is always present; the collections default to `[]` and are never null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: User,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub recommendations: Vec<Product>,
}

/// Where a served payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    Cache,
    Upstreams,
}

/// Serialized profile ready to be written to the client.
#[derive(Debug, Clone)]
pub struct ProfilePayload {
    /// JSON body, byte-identical for cached and fresh responses.
    pub body: Vec<u8>,
    pub source: PayloadSource,
}
