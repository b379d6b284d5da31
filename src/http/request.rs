//! Request handling.
//!
//! # Responsibilities
//! - Define the `/ask` request body
//! - Extract the inbound trace context and request ID
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing (tower-http layer)
//! - An unreadable `traceparent` header counts as absent

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::observability::TRACEPARENT;

/// Header carrying the per-request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Body of `POST /ask`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// The caller's `traceparent`, if present and readable.
pub fn inbound_traceparent(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(TRACEPARENT)?;
    match value.to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            tracing::warn!("Ignoring non-ASCII traceparent header");
            None
        }
    }
}

/// Request ID assigned by the middleware stack.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_inbound_traceparent() {
        let mut headers = HeaderMap::new();
        assert_eq!(inbound_traceparent(&headers), None);

        headers.insert(TRACEPARENT, HeaderValue::from_static("00-abc-def-01"));
        assert_eq!(inbound_traceparent(&headers), Some("00-abc-def-01"));

        headers.insert(TRACEPARENT, HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap());
        assert_eq!(inbound_traceparent(&headers), None);
    }

    #[test]
    fn test_prompt_optional_in_body() {
        let body: AskRequest = serde_json::from_str("{}").unwrap();
        assert!(body.prompt.is_none());
    }
}
