//! Prompt relay service.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                  PROMPT RELAY                     │
//!   POST /ask          │  ┌─────────┐    ┌──────────────┐    ┌──────────┐ │
//!   traceparent? ──────┼─▶│  http   │───▶│    relay     │───▶│ provider │─┼──▶ LLM API
//!                      │  │ server  │    │   workflow   │    │ (chat /  │ │    traceparent
//!   {response,   ◀─────┼──│         │◀───│ resolve id,  │◀───│responses)│◀┼─── JSON payload
//!    traceparent}      │  └─────────┘    │ extract text │    └──────────┘ │
//!                      │                 └──────────────┘                 │
//!                      │  ┌────────────────────────────────────────────┐  │
//!                      │  │ config │ logging │ metrics │ telemetry     │──┼──▶ trace collector
//!                      │  └────────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use prompt_relay::config::load_config;
use prompt_relay::observability::logging::init_logging;
use prompt_relay::observability::metrics::init_metrics;
use prompt_relay::observability::telemetry::init_telemetry;
use prompt_relay::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "prompt-relay", version)]
#[command(about = "Relay prompts to an LLM API with W3C trace context propagation", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let dotenv = dotenvy::dotenv();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("prompt-relay: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Telemetry problems are reported once logging is up, then ignored.
    let (telemetry_layer, exporter, telemetry_error) = if config.telemetry.enabled {
        match init_telemetry(&config.telemetry) {
            Ok((layer, exporter)) => (Some(layer), Some(exporter), None),
            Err(e) => (None, None, Some(e)),
        }
    } else {
        (None, None, None)
    };

    if let Err(e) = init_logging(&config.observability, telemetry_layer) {
        eprintln!("prompt-relay: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("prompt-relay v{} starting", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    match (&exporter, telemetry_error) {
        (Some(exporter), _) => tracing::info!(url = %exporter.url(), "Telemetry initialized successfully"),
        (None, Some(e)) => tracing::error!(error = %e, "Error initializing telemetry, continuing without span export"),
        (None, None) => tracing::info!("Telemetry disabled"),
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        provider = ?config.provider.kind,
        model = %config.provider.model(),
        request_timeout_secs = config.timeouts.request_secs,
        provider_timeout_secs = config.timeouts.provider_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let _signal_task = shutdown.trigger_on_signal();

    let exporter_task = exporter.map(|exporter| tokio::spawn(exporter.run(shutdown.subscribe())));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let code = match serve(config, &shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    };

    // The server may have stopped on its own; make sure the exporter flushes.
    shutdown.trigger();
    if let Some(task) = exporter_task {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    code
}

async fn serve(config: prompt_relay::RelayConfig, shutdown: &Shutdown) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
