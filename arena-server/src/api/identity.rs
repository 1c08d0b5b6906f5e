//! Caller identity extraction
//!
//! Login and session issuance live in an external collaborator; by the
//! time a request reaches this service, the verified identity (if any)
//! arrives in a trusted header set by that layer.

use arena_common::{Error, Result};
use axum::http::HeaderMap;

/// Header carrying the verified caller identity
pub const IDENTITY_HEADER: &str = "x-arena-user";

/// Extract the verified identity, if present
pub fn identity_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Extract the verified identity or reject the call
pub fn require_identity(headers: &HeaderMap) -> Result<String> {
    identity_from_headers(headers).ok_or_else(|| {
        Error::Unauthorized("This operation requires a verified identity".to_string())
    })
}
