//! Completion provider subsystem.
//!
//! # Data Flow
//! ```text
//! PromptRelayWorkflow
//!     → CompletionProvider::complete(prompt, trace headers)
//!         chat_completions.rs  POST {base}/chat/completions  {model, messages}
//!         responses.rs         POST {base}/responses         {model, input}
//!     → raw JSON payload
//!     → answer extracted at CompletionProvider::answer_pointer()
//! ```
//!
//! # Design Decisions
//! - One workflow, interchangeable request styles chosen by config
//! - Providers return the raw payload; extraction policy lives in the workflow
//! - Single attempt per call; the shared reqwest client owns timeouts and pooling

pub mod chat_completions;
pub mod error;
pub mod responses;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::config::{ProviderConfig, ProviderKind, TimeoutConfig};

pub use chat_completions::ChatCompletionsProvider;
pub use error::{ProviderError, ProviderResult};
pub use responses::ResponsesProvider;

/// A backend able to answer a single prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs and metrics.
    fn name(&self) -> &str;

    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    /// Submit `prompt`, forwarding `trace_headers`, and return the raw payload.
    async fn complete(&self, prompt: &str, trace_headers: HeaderMap) -> ProviderResult<Value>;

    /// JSON pointer to the answer text inside the payload.
    fn answer_pointer(&self) -> &'static str;
}

/// Build the outbound HTTP client with the configured deadlines.
pub fn build_http_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.provider_secs))
        .build()
}

/// Instantiate the provider named by `config.kind`.
pub fn from_config(config: &ProviderConfig, client: reqwest::Client) -> Arc<dyn CompletionProvider> {
    match config.kind {
        ProviderKind::ChatCompletions => Arc::new(ChatCompletionsProvider::new(
            client,
            &config.base_url,
            &config.api_key,
            config.model(),
        )),
        ProviderKind::Responses => Arc::new(ResponsesProvider::new(
            client,
            &config.base_url,
            &config.api_key,
            config.model(),
        )),
    }
}

/// Join a base URL and an endpoint path.
fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// POST a JSON body with bearer auth and decode the JSON answer.
async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    trace_headers: HeaderMap,
    body: &Value,
) -> ProviderResult<Value> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .headers(trace_headers)
        .json(body)
        .send()
        .await
        .map_err(ProviderError::from_transport)?;

    let status = response.status();
    let text = response.text().await.map_err(ProviderError::from_transport)?;

    if !status.is_success() {
        return Err(ProviderError::status(status.as_u16(), &text));
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
}
