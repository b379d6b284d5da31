//! Distributed trace context.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests
//! - Mint a trace context when the caller sent none
//! - Propagate trace context to provider requests
//!
//! # Design Decisions
//! - Supports the W3C Trace Context `traceparent` header
//! - Inbound values are opaque: they are forwarded and echoed verbatim,
//!   never validated or normalized
//! - Field parsing exists only so telemetry can link spans

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header key carrying the trace context.
pub const TRACEPARENT: &str = "traceparent";

/// Parent-id used for minted identifiers.
const ZERO_PARENT_ID: &str = "0000000000000000";

/// A `traceparent` value chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceParent(String);

/// The four fields of a well-formed `traceparent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFields<'a> {
    pub version: &'a str,
    pub trace_id: &'a str,
    pub parent_id: &'a str,
    pub flags: &'a str,
}

impl TraceParent {
    /// Mint a new identifier: `00-<32 hex>-0000000000000000-01`.
    pub fn generate() -> Self {
        let trace_id = Uuid::new_v4().simple().to_string();
        Self(format!("00-{}-{}-01", trace_id, ZERO_PARENT_ID))
    }

    /// Wrap a caller-supplied value without inspecting it.
    pub fn from_inbound(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Split into fields if the value is well formed.
    pub fn fields(&self) -> Option<TraceFields<'_>> {
        parse_fields(&self.0)
    }

    /// Insert this identifier under [`TRACEPARENT`].
    pub fn forward(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        headers.insert(TRACEPARENT, HeaderValue::from_str(&self.0)?);
        tracing::debug!(traceparent = %self.0, "Forwarding trace ID");
        Ok(())
    }
}

impl fmt::Display for TraceParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TraceParent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parse `version-traceid-parentid-flags`, lowercase or uppercase hex.
pub fn parse_fields(value: &str) -> Option<TraceFields<'_>> {
    let mut parts = value.split('-');
    let fields = TraceFields {
        version: parts.next()?,
        trace_id: parts.next()?,
        parent_id: parts.next()?,
        flags: parts.next()?,
    };
    if parts.next().is_some() {
        return None;
    }

    let widths = [
        (fields.version, 2),
        (fields.trace_id, 32),
        (fields.parent_id, 16),
        (fields.flags, 2),
    ];
    let well_formed = widths
        .iter()
        .all(|(field, len)| field.len() == *len && field.bytes().all(|b| b.is_ascii_hexdigit()));

    well_formed.then_some(fields)
}
