//! The prompt relay workflow.
//!
//! One call turns one prompt into one answer:
//! resolve traceparent → forward it with the prompt → extract the answer.

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::HeaderMap;
use serde_json::Value;
use thiserror::Error;
use tracing::field::Empty;
use tracing::Instrument;

use crate::observability::metrics;
use crate::observability::TraceParent;
use crate::provider::{CompletionProvider, ProviderError};

/// Answer used when the provider payload lacks the answer field.
pub const NO_RESPONSE_CONTENT: &str = "No response content";

/// Errors surfaced by [`PromptRelayWorkflow::handle`].
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Answer text plus the traceparent the request ran under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub response: String,
    pub traceparent: TraceParent,
}

/// Stateless relay from prompt to provider answer.
pub struct PromptRelayWorkflow {
    provider: Arc<dyn CompletionProvider>,
}

impl PromptRelayWorkflow {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn CompletionProvider {
        self.provider.as_ref()
    }

    /// Relay `prompt` under the inbound traceparent, or a freshly minted one.
    pub async fn handle(
        &self,
        prompt: &str,
        inbound_traceparent: Option<&str>,
    ) -> Result<RelayOutcome, RelayError> {
        if prompt.trim().is_empty() {
            tracing::warn!("Rejecting empty prompt");
            return Err(RelayError::EmptyPrompt);
        }

        let traceparent = resolve_traceparent(inbound_traceparent);

        let span = tracing::info_span!(
            "process_prompt",
            traceparent = %traceparent,
            provider = self.provider.name(),
            status = Empty,
        );
        let result = self
            .process_prompt(prompt, &traceparent)
            .instrument(span.clone())
            .await;
        span.record("status", status_label(result.is_ok()));

        Ok(RelayOutcome {
            response: result?,
            traceparent,
        })
    }

    async fn process_prompt(&self, prompt: &str, traceparent: &TraceParent) -> Result<String, RelayError> {
        tracing::info!(traceparent = %traceparent, "Starting workflow");
        let payload = self.generate_response(prompt, traceparent).await?;
        Ok(extract_answer(&payload, self.provider.answer_pointer()))
    }

    async fn generate_response(
        &self,
        prompt: &str,
        traceparent: &TraceParent,
    ) -> Result<Value, ProviderError> {
        let span = tracing::info_span!(
            "generate_response",
            provider = self.provider.name(),
            model = self.provider.model(),
            status = Empty,
        );

        let result = async {
            tracing::debug!(prompt = %prompt, "Generating response");

            let mut headers = HeaderMap::new();
            if let Err(e) = traceparent.forward(&mut headers) {
                tracing::error!(error = %e, "Trace ID is not a valid header value");
                return Err(ProviderError::InvalidHeader(e.to_string()));
            }

            let start = Instant::now();
            let result = self.provider.complete(prompt, headers).await;
            metrics::record_provider_call(self.provider.name(), result.is_ok(), start);

            match &result {
                Ok(_) => tracing::info!("Provider response received successfully"),
                Err(e) => tracing::error!(
                    traceparent = %traceparent,
                    provider = self.provider.name(),
                    error = %e,
                    "Error communicating with provider"
                ),
            }
            result
        }
        .instrument(span.clone())
        .await;

        span.record("status", status_label(result.is_ok()));
        result
    }
}

/// Keep a non-empty inbound value verbatim, otherwise mint one.
fn resolve_traceparent(inbound: Option<&str>) -> TraceParent {
    if let Some(value) = inbound.filter(|v| !v.is_empty()) {
        tracing::info!(traceparent = %value, "Trace ID received");
        return TraceParent::from_inbound(value);
    }

    tracing::warn!("No trace ID provided. Generating new trace ID.");
    let span = tracing::info_span!("generate_trace_id", traceparent = Empty, status = Empty);
    let _guard = span.enter();

    let traceparent = TraceParent::generate();
    span.record("traceparent", traceparent.as_str());
    span.record("status", "ok");
    metrics::record_trace_id_generated();
    tracing::debug!(traceparent = %traceparent, "Generated trace ID");

    traceparent
}

/// Answer text at `pointer`, or [`NO_RESPONSE_CONTENT`].
pub fn extract_answer(payload: &Value, pointer: &str) -> String {
    match payload.pointer(pointer) {
        Some(Value::String(text)) => text.clone(),
        _ => {
            tracing::warn!(pointer, "Answer field missing from provider response");
            NO_RESPONSE_CONTENT.to_string()
        }
    }
}

fn status_label(ok: bool) -> &'static str {
    if ok { "ok" } else { "error" }
}
