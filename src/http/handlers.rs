//! Route handlers.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::http::request::{inbound_traceparent, request_id, AskRequest};
use crate::http::response::{ApiError, AskResponse, HealthResponse};
use crate::http::server::AppState;
use crate::observability::metrics;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// `GET /`
pub async fn index() -> Html<&'static str> {
    tracing::info!("Rendering frontend UI");
    Html(INDEX_HTML)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider = state.workflow.provider();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: provider.name().to_string(),
        model: provider.model().to_string(),
    })
}

/// `POST /ask`
pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers).to_string();

    let response = match relay_prompt(&state, &headers, payload).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!(request_id = %request_id, error = %e, "Error in ask endpoint");
            } else {
                tracing::warn!(request_id = %request_id, error = %e, "Rejected ask request");
            }
            e.into_response()
        }
    };

    metrics::record_request("/ask", response.status().as_u16(), start);
    response
}

async fn relay_prompt(
    state: &AppState,
    headers: &HeaderMap,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<AskResponse, ApiError> {
    let Json(request) = payload?;
    let prompt = request.prompt.ok_or(ApiError::MissingPrompt)?;

    let outcome = state
        .workflow
        .handle(&prompt, inbound_traceparent(headers))
        .await?;

    Ok(outcome.into())
}
