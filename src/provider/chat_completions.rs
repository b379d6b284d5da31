//! Chat-completions provider (raw HTTP).

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

use super::{endpoint_url, post_json, CompletionProvider, ProviderResult};

/// Provider for `POST /chat/completions`.
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            url: endpoint_url(base_url, "chat/completions"),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Single user message request body.
    pub fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        "chat_completions"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, trace_headers: HeaderMap) -> ProviderResult<Value> {
        tracing::debug!(url = %self.url, model = %self.model, "Sending chat completion request");
        let body = self.build_body(prompt);
        post_json(&self.client, &self.url, &self.api_key, trace_headers, &body).await
    }

    fn answer_pointer(&self) -> &'static str {
        "/choices/0/message/content"
    }
}
