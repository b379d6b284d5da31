//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Router;
use prompt_relay::config::{ProviderKind, RelayConfig};
use prompt_relay::{HttpServer, Shutdown};
use serde_json::Value;
use tokio::net::TcpListener;

/// One request received by a mock upstream.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

#[allow(dead_code)]
impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A running mock upstream (LLM provider or trace collector).
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockUpstream {
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock upstream that always answers `status` with a JSON `body`.
#[allow(dead_code)]
pub async fn start_mock_provider(status: u16, body: Value) -> MockUpstream {
    start_programmable_provider(move || {
        let body = body.to_string();
        async move { (status, body) }
    })
    .await
}

/// Start a programmable mock upstream with async support.
pub async fn start_programmable_provider<F, Fut>(f: F) -> MockUpstream
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = requests.clone();
    let f = Arc::new(f);

    let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: Bytes| {
        let captured = captured.clone();
        let f = f.clone();
        async move {
            captured.lock().unwrap().push(CapturedRequest {
                path: uri.path().to_string(),
                headers,
                body: serde_json::from_slice(&body).unwrap_or(Value::Null),
            });

            let (status, body) = f().await;
            (
                StatusCode::from_u16(status).unwrap(),
                [("content-type", "application/json")],
                body,
            )
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, requests }
}

/// Relay config pointing at a mock provider.
#[allow(dead_code)]
pub fn relay_config(provider_addr: SocketAddr, kind: ProviderKind) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.provider.kind = kind;
    config.provider.base_url = format!("http://{}/v1", provider_addr);
    config.provider.api_key = "sk-test".into();
    config.observability.metrics_enabled = false;
    config
}

/// Start the relay on an ephemeral port.
#[allow(dead_code)]
pub async fn start_relay(config: RelayConfig) -> (String, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (format!("http://{}", addr), shutdown)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}

/// `00-<32 lowercase hex>-0000000000000000-01`
#[allow(dead_code)]
pub fn is_minted_traceparent(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    parts.len() == 4
        && parts[0] == "00"
        && parts[1].len() == 32
        && parts[1].bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        && parts[2] == "0000000000000000"
        && parts[3] == "01"
}
