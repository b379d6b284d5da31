//! Response handling.
//!
//! # Responsibilities
//! - Define JSON response bodies
//! - Map workflow errors to HTTP status codes
//! - Rewrite middleware failures (timeout, unknown route) as JSON errors
//!
//! # Design Decisions
//! - Every failure is a JSON object with a single `error` field
//! - Bad input → 4xx, provider failure → 500
//! - Error bodies never carry `response` or `traceparent`

use axum::{
    body::to_bytes,
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::relay::{RelayError, RelayOutcome};

/// Longest plain-text failure body carried into an [`ErrorBody`].
const MAX_ERROR_TEXT: usize = 4096;

/// Successful `/ask` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
    pub traceparent: String,
}

impl From<RelayOutcome> for AskResponse {
    fn from(outcome: RelayOutcome) -> Self {
        Self {
            response: outcome.response,
            traceparent: outcome.traceparent.into_inner(),
        }
    }
}

/// Failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub model: String,
}

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("prompt is required")]
    MissingPrompt,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejected { status, .. } => *status,
            ApiError::MissingPrompt | ApiError::Relay(RelayError::EmptyPrompt) => StatusCode::BAD_REQUEST,
            ApiError::Relay(RelayError::Provider(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Wrong shape or missing content type is still malformed input.
        let status = match &rejection {
            JsonRejection::MissingJsonContentType(_) => StatusCode::BAD_REQUEST,
            _ if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
            _ => rejection.status(),
        };
        ApiError::Rejected {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Replace a non-JSON failure response with an [`ErrorBody`].
///
/// Success responses and failures that are already JSON pass through.
pub async fn ensure_json_error(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let message = to_bytes(body, MAX_ERROR_TEXT)
        .await
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    let mut rewritten = ApiError::Rejected { status, message }.into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rewritten.headers_mut().append(name.clone(), value.clone());
        }
    }
    rewritten
}
