//! Failure injection tests for the prompt relay.

use std::time::Duration;

use prompt_relay::config::ProviderKind;
use prompt_relay::http::ErrorBody;
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

async fn ask(relay: &str, prompt: &str) -> reqwest::Response {
    common::client()
        .post(format!("{}/ask", relay))
        .header("traceparent", "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01")
        .json(&json!({ "prompt": prompt }))
        .send()
        .await
        .expect("Relay unreachable")
}

async fn assert_error_only(res: reqwest::Response) -> String {
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    let object = body.as_object().expect("JSON object");
    assert_eq!(object.len(), 1, "unexpected fields in {}", body);
    let error: ErrorBody = serde_json::from_value(body).unwrap();
    assert!(!error.error.is_empty());
    error.error
}

#[tokio::test]
async fn test_provider_error_status_becomes_500() {
    let provider = common::start_mock_provider(
        401,
        json!({ "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" } }),
    )
    .await;
    let (relay, shutdown) =
        common::start_relay(common::relay_config(provider.addr, ProviderKind::ChatCompletions)).await;

    let message = assert_error_only(ask(&relay, "hello").await).await;
    assert!(message.contains("401"), "message: {}", message);
    assert!(message.contains("Incorrect API key"), "message: {}", message);

    // Single attempt, no retry.
    assert_eq!(provider.requests().len(), 1);
    shutdown.trigger();
}

#[tokio::test]
async fn test_server_error_not_retried() {
    let provider = common::start_mock_provider(503, json!({ "error": "overloaded" })).await;
    let (relay, shutdown) =
        common::start_relay(common::relay_config(provider.addr, ProviderKind::Responses)).await;

    assert_error_only(ask(&relay, "hello").await).await;
    assert_eq!(provider.requests().len(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_malformed_payload_becomes_500() {
    let provider = common::start_programmable_provider(|| async { (200, "<html>gateway</html>".to_string()) }).await;
    let (relay, shutdown) =
        common::start_relay(common::relay_config(provider.addr, ProviderKind::ChatCompletions)).await;

    let message = assert_error_only(ask(&relay, "hello").await).await;
    assert!(message.starts_with("Malformed provider response"), "message: {}", message);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_provider_becomes_500() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let (relay, shutdown) =
        common::start_relay(common::relay_config(dead_addr, ProviderKind::ChatCompletions)).await;

    let message = assert_error_only(ask(&relay, "hello").await).await;
    assert!(message.starts_with("Network error"), "message: {}", message);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let provider = common::start_programmable_provider(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, json!({ "choices": [] }).to_string())
    })
    .await;
    let mut config = common::relay_config(provider.addr, ProviderKind::ChatCompletions);
    config.timeouts.provider_secs = 1;
    let (relay, shutdown) = common::start_relay(config).await;

    let message = assert_error_only(ask(&relay, "hello").await).await;
    assert_eq!(message, "Provider request timed out");

    shutdown.trigger();
}
