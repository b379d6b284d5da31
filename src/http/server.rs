//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Give middleware-generated failures the JSON error body
//! - Bind server to listener
//! - Graceful shutdown on broadcast signal

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::handlers;
use crate::http::response::ensure_json_error;
use crate::provider;
use crate::relay::PromptRelayWorkflow;

/// Application state injected into handlers.
///
/// Built once at startup; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<PromptRelayWorkflow>,
}

/// HTTP server for the prompt relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server, building the provider named in `config`.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let client = provider::build_http_client(&config.timeouts)?;
        let provider = provider::from_config(&config.provider, client);

        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            base_url = %config.provider.base_url,
            "Completion provider configured"
        );

        let workflow = Arc::new(PromptRelayWorkflow::new(provider));
        Ok(Self::with_workflow(config, workflow))
    }

    /// Create a server around an existing workflow.
    pub fn with_workflow(config: RelayConfig, workflow: Arc<PromptRelayWorkflow>) -> Self {
        let state = AppState { workflow };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The body limit is enforced by the JSON extractor, so oversized
    /// bodies surface as a handler rejection.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route("/ask", post(handlers::ask))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(middleware::map_response(ensure_json_error))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                    .layer(DefaultBodyLimit::max(config.security.max_body_size)),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
