//! Responses-API provider.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

use super::{endpoint_url, post_json, CompletionProvider, ProviderResult};

/// Provider for `POST /responses`.
pub struct ResponsesProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ResponsesProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            url: endpoint_url(base_url, "responses"),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn build_body(&self, prompt: &str) -> Value {
        json!({ "model": self.model, "input": prompt })
    }
}

#[async_trait]
impl CompletionProvider for ResponsesProvider {
    fn name(&self) -> &str {
        "responses"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, trace_headers: HeaderMap) -> ProviderResult<Value> {
        tracing::debug!(url = %self.url, model = %self.model, "Sending responses request");
        let body = self.build_body(prompt);
        post_json(&self.client, &self.url, &self.api_key, trace_headers, &body).await
    }

    fn answer_pointer(&self) -> &'static str {
        "/output/0/content/0/text"
    }
}
