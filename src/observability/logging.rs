//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Attach the telemetry layer when span export is configured
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config, overridden by `RUST_LOG`
//! - The level filter applies to log output only; span export sees this
//!   crate's spans at every level

use tracing::{Level, Subscriber};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::observability::telemetry::TelemetryLayer;

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(log_level: &str) -> String {
    format!("prompt_relay={level},tower_http={level}", level = log_level)
}

/// Build the subscriber stack without installing it.
pub fn build_subscriber(
    config: &ObservabilityConfig,
    filter: EnvFilter,
    telemetry: Option<TelemetryLayer>,
) -> impl Subscriber + Send + Sync {
    let output = match config.log_format {
        LogFormat::Pretty => fmt::layer().with_filter(filter).boxed(),
        LogFormat::Json => fmt::layer().json().with_filter(filter).boxed(),
    };

    let export = telemetry
        .map(|layer| layer.with_filter(Targets::new().with_target("prompt_relay", Level::TRACE)));

    Registry::default().with(output).with(export)
}

/// Install the global subscriber.
pub fn init_logging(
    config: &ObservabilityConfig,
    telemetry: Option<TelemetryLayer>,
) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    build_subscriber(config, filter, telemetry).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives("info"), "prompt_relay=info,tower_http=info");
    }

    #[test]
    fn test_export_ignores_log_level() {
        let (layer, mut rx) = TelemetryLayer::channel(8);
        let config = ObservabilityConfig::default();
        let subscriber = build_subscriber(&config, EnvFilter::new("warn"), Some(layer));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info_span!("process_prompt").in_scope(|| {});
            tracing::debug_span!("generate_trace_id").in_scope(|| {});
        });

        let mut names = Vec::new();
        while let Ok(record) = rx.try_recv() {
            names.push(record.name);
        }
        assert_eq!(names, vec!["process_prompt", "generate_trace_id"]);
    }
}
