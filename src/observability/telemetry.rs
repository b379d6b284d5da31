//! Span export to an external trace collector.
//!
//! # Data Flow
//! ```text
//! workflow spans (process_prompt, generate_response, generate_trace_id)
//!     → TelemetryLayer (on close: SpanRecord, non-blocking send to a bounded queue)
//!     → TelemetryExporter task (batch by size or interval)
//!     → POST {endpoint}/v1/traces (OTLP/HTTP, JSON encoding)
//! ```
//!
//! Only spans emitted by this crate are exported. The trace id of every span
//! is taken from the request's `traceparent`, so the collector places the
//! relay's spans inside the caller's trace.
//!
//! When the queue is full (collector slow or unreachable) new records are
//! dropped and counted rather than buffered.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tracing::field::{Field, Visit};
use tracing::{span, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;
use url::Url;
use uuid::Uuid;

use crate::config::TelemetryConfig;
use crate::observability::metrics;
use crate::observability::trace_context::{parse_fields, TRACEPARENT};

/// Target prefix of spans worth exporting.
const CRATE_TARGET: &str = "prompt_relay";

/// Span field holding the step outcome.
const STATUS_FIELD: &str = "status";

/// Errors raised while setting up telemetry. Never fatal to the relay.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry endpoint is empty")]
    MissingEndpoint,

    #[error("telemetry endpoint '{endpoint}' is invalid: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("telemetry token is empty")]
    MissingToken,

    #[error("telemetry token is not a valid header value")]
    InvalidToken,

    #[error("failed to build telemetry HTTP client: {0}")]
    Client(String),
}

/// Outcome recorded on a span through its `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
    Unset,
    Ok,
    Error,
}

impl SpanStatus {
    fn otlp_code(self) -> u8 {
        match self {
            SpanStatus::Unset => 0,
            SpanStatus::Ok => 1,
            SpanStatus::Error => 2,
        }
    }
}

/// A closed span, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    pub name: &'static str,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub start_unix_nanos: u64,
    pub end_unix_nanos: u64,
    pub attributes: BTreeMap<String, String>,
    pub status: SpanStatus,
}

#[derive(Default)]
struct FieldMap(BTreeMap<String, String>);

impl Visit for FieldMap {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

/// Per-span state kept in the registry's extensions.
struct SpanData {
    span_id: String,
    trace_id: String,
    parent_span_id: Option<String>,
    has_local_parent: bool,
    start: SystemTime,
    fields: FieldMap,
}

impl SpanData {
    /// Take trace id (and remote parent for root spans) from a `traceparent` field.
    fn adopt_traceparent(&mut self) {
        let parsed = self.fields.0.get(TRACEPARENT).and_then(|value| {
            parse_fields(value)
                .map(|f| (f.trace_id.to_ascii_lowercase(), f.parent_id.to_ascii_lowercase()))
        });

        if let Some((trace_id, parent_id)) = parsed {
            self.trace_id = trace_id;
            if !self.has_local_parent && parent_id.bytes().any(|b| b != b'0') {
                self.parent_span_id = Some(parent_id);
            }
        }
    }

    fn finish(self, name: &'static str, end: SystemTime) -> SpanRecord {
        let status = match self.fields.0.get(STATUS_FIELD).map(String::as_str) {
            Some("ok") => SpanStatus::Ok,
            Some("error") => SpanStatus::Error,
            _ => SpanStatus::Unset,
        };

        SpanRecord {
            name,
            trace_id: self.trace_id,
            span_id: self.span_id,
            parent_span_id: self.parent_span_id,
            start_unix_nanos: unix_nanos(self.start),
            end_unix_nanos: unix_nanos(end),
            attributes: self.fields.0,
            status,
        }
    }
}

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn new_span_id() -> String {
    Uuid::new_v4().simple().to_string()[..16].to_string()
}

/// `tracing_subscriber` layer turning this crate's spans into [`SpanRecord`]s.
pub struct TelemetryLayer {
    tx: mpsc::Sender<SpanRecord>,
    dropped: Arc<AtomicU64>,
}

impl TelemetryLayer {
    /// Create a layer and the receiving end of its record queue.
    ///
    /// At most `capacity` records wait for the exporter.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SpanRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let layer = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (layer, rx)
    }

    /// Records discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<S> Layer<S> for TelemetryLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        if !span.metadata().target().starts_with(CRATE_TARGET) {
            return;
        }

        let mut fields = FieldMap::default();
        attrs.record(&mut fields);

        let parent = span.scope().skip(1).find_map(|ancestor| {
            let extensions = ancestor.extensions();
            let ids = extensions
                .get::<SpanData>()
                .map(|data| (data.trace_id.clone(), data.span_id.clone()));
            ids
        });

        let mut data = SpanData {
            span_id: new_span_id(),
            trace_id: parent
                .as_ref()
                .map(|(trace_id, _)| trace_id.clone())
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            has_local_parent: parent.is_some(),
            parent_span_id: parent.map(|(_, span_id)| span_id),
            start: SystemTime::now(),
            fields,
        };
        data.adopt_traceparent();

        span.extensions_mut().insert(data);
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(data) = extensions.get_mut::<SpanData>() {
            values.record(&mut data.fields);
            data.adopt_traceparent();
        }
    }

    fn on_close(&self, id: span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let Some(data) = span.extensions_mut().remove::<SpanData>() else { return };

        match self.tx.try_send(data.finish(span.metadata().name(), SystemTime::now())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_span_dropped();
            }
            // Exporter has shut down.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Build the OTLP/HTTP JSON body for a batch of spans.
pub fn otlp_payload(app_name: &str, records: &[SpanRecord]) -> Value {
    let spans: Vec<Value> = records
        .iter()
        .map(|record| {
            let attributes: Vec<Value> = record
                .attributes
                .iter()
                .map(|(key, value)| json!({ "key": key, "value": { "stringValue": value } }))
                .collect();

            let mut span = json!({
                "traceId": record.trace_id,
                "spanId": record.span_id,
                "name": record.name,
                "kind": 1,
                "startTimeUnixNano": record.start_unix_nanos.to_string(),
                "endTimeUnixNano": record.end_unix_nanos.to_string(),
                "attributes": attributes,
                "status": { "code": record.status.otlp_code() },
            });
            if let Some(parent) = &record.parent_span_id {
                span["parentSpanId"] = json!(parent);
            }
            span
        })
        .collect();

    json!({
        "resourceSpans": [{
            "resource": {
                "attributes": [
                    { "key": "service.name", "value": { "stringValue": app_name } }
                ]
            },
            "scopeSpans": [{
                "scope": { "name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") },
                "spans": spans,
            }]
        }]
    })
}

/// Background task shipping span batches to the collector.
pub struct TelemetryExporter {
    client: reqwest::Client,
    url: Url,
    app_name: String,
    batch_size: usize,
    flush_interval: Duration,
    rx: mpsc::Receiver<SpanRecord>,
}

/// Validate telemetry settings and build the layer/exporter pair.
pub fn init_telemetry(
    config: &TelemetryConfig,
) -> Result<(TelemetryLayer, TelemetryExporter), TelemetryError> {
    let endpoint = config.endpoint.trim();
    if endpoint.is_empty() {
        return Err(TelemetryError::MissingEndpoint);
    }

    let url = Url::parse(&format!("{}/v1/traces", endpoint.trim_end_matches('/')))
        .map_err(|e| TelemetryError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TelemetryError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if config.token.trim().is_empty() {
        return Err(TelemetryError::MissingToken);
    }
    let mut auth = HeaderValue::from_str(&format!("Api-Token {}", config.token.trim()))
        .map_err(|_| TelemetryError::InvalidToken)?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| TelemetryError::Client(e.to_string()))?;

    let (layer, rx) = TelemetryLayer::channel(config.queue_capacity);
    let exporter = TelemetryExporter {
        client,
        url,
        app_name: config.app_name.clone(),
        batch_size: config.batch_size.max(1),
        flush_interval: Duration::from_millis(config.flush_interval_ms.max(10)),
        rx,
    };

    Ok((layer, exporter))
}

impl TelemetryExporter {
    /// Collector URL spans are posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Run until shutdown is signalled or every layer is dropped, then flush.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(url = %self.url, app_name = %self.app_name, "Telemetry exporter starting");

        let mut batch = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval(self.flush_interval);

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(record) => {
                        batch.push(record);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => self.flush(&mut batch).await,
                _ = shutdown.recv() => {
                    while let Ok(record) = self.rx.try_recv() {
                        batch.push(record);
                    }
                    break;
                }
            }
        }

        self.flush(&mut batch).await;
        tracing::info!("Telemetry exporter stopped");
    }

    async fn flush(&self, batch: &mut Vec<SpanRecord>) {
        if batch.is_empty() {
            return;
        }

        let records = std::mem::take(batch);
        let payload = otlp_payload(&self.app_name, &records);

        match self.client.post(self.url.clone()).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(spans = records.len(), "Exported spans");
            }
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    spans = records.len(),
                    "Collector rejected span export"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, spans = records.len(), "Span export failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    const INBOUND: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn drain(rx: &mut mpsc::Receiver<SpanRecord>) -> Vec<SpanRecord> {
        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_layer_links_spans_to_inbound_trace() {
        let (layer, mut rx) = TelemetryLayer::channel(16);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let root = tracing::info_span!(
                "process_prompt",
                traceparent = INBOUND,
                status = tracing::field::Empty
            );
            let _guard = root.enter();
            {
                let child = tracing::info_span!("generate_response", provider = "chat_completions");
                let _child_guard = child.enter();
            }
            root.record("status", "ok");
        });

        let records = drain(&mut rx);
        assert_eq!(records.len(), 2);
        let (child, root) = (&records[0], &records[1]);

        assert_eq!(child.name, "generate_response");
        assert_eq!(root.name, "process_prompt");
        assert_eq!(root.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(child.trace_id, root.trace_id);
        assert_eq!(child.parent_span_id.as_deref(), Some(root.span_id.as_str()));
        assert_eq!(root.parent_span_id.as_deref(), Some("00f067aa0ba902b7"));
        assert_eq!(root.status, SpanStatus::Ok);
        assert_eq!(child.status, SpanStatus::Unset);
        assert_eq!(child.attributes.get("provider").map(String::as_str), Some("chat_completions"));
        assert!(root.end_unix_nanos >= root.start_unix_nanos);
    }

    #[test]
    fn test_late_recorded_traceparent_sets_trace_id() {
        let (layer, mut rx) = TelemetryLayer::channel(16);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("generate_trace_id", traceparent = tracing::field::Empty);
            let _guard = span.enter();
            span.record("traceparent", "00-0af7651916cd43dd8448eb211c80319c-0000000000000000-01");
        });

        let records = drain(&mut rx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].trace_id, "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(records[0].parent_span_id, None);
    }

    #[test]
    fn test_foreign_spans_ignored() {
        let (layer, mut rx) = TelemetryLayer::channel(16);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!(target: "hyper_util::client", "connect");
            let _guard = span.enter();
        });

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let (layer, mut rx) = TelemetryLayer::channel(2);
        let dropped = Arc::clone(&layer.dropped);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..5 {
                let span = tracing::info_span!("process_prompt");
                let _guard = span.enter();
            }
        });

        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(dropped.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_drained_queue_accepts_again() {
        let (layer, mut rx) = TelemetryLayer::channel(1);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info_span!("generate_trace_id").in_scope(|| {});
            tracing::info_span!("generate_trace_id").in_scope(|| {});
            assert_eq!(drain(&mut rx).len(), 1);

            tracing::info_span!("generate_response").in_scope(|| {});
            let records = drain(&mut rx);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].name, "generate_response");
        });
    }

    #[test]
    fn test_otlp_payload_shape() {
        let mut attributes = BTreeMap::new();
        attributes.insert("provider".to_string(), "responses".to_string());
        let record = SpanRecord {
            name: "generate_response",
            trace_id: "4bf92f3577b34da6a3ce929d0e0e4736".into(),
            span_id: "a3ce929d0e0e4736".into(),
            parent_span_id: None,
            start_unix_nanos: 10,
            end_unix_nanos: 20,
            attributes,
            status: SpanStatus::Error,
        };

        let payload = otlp_payload("openai-llm-chat", &[record]);
        let resource = &payload["resourceSpans"][0];
        assert_eq!(resource["resource"]["attributes"][0]["value"]["stringValue"], "openai-llm-chat");

        let span = &resource["scopeSpans"][0]["spans"][0];
        assert_eq!(span["name"], "generate_response");
        assert_eq!(span["startTimeUnixNano"], "10");
        assert_eq!(span["status"]["code"], 2);
        assert!(span.get("parentSpanId").is_none());
        assert_eq!(span["attributes"][0]["key"], "provider");
    }

    #[test]
    fn test_init_rejects_bad_settings() {
        let mut config = TelemetryConfig::default();
        assert!(matches!(init_telemetry(&config), Err(TelemetryError::MissingEndpoint)));

        config.endpoint = "collector without scheme".into();
        assert!(matches!(init_telemetry(&config), Err(TelemetryError::InvalidEndpoint { .. })));

        config.endpoint = "https://collector.example/api/v2/otlp".into();
        assert!(matches!(init_telemetry(&config), Err(TelemetryError::MissingToken)));

        config.token = "bad\ntoken".into();
        assert!(matches!(init_telemetry(&config), Err(TelemetryError::InvalidToken)));
    }

    #[test]
    fn test_init_builds_traces_url() {
        let config = TelemetryConfig {
            enabled: true,
            endpoint: "https://collector.example/api/v2/otlp/".into(),
            token: "dt0c01.secret".into(),
            ..TelemetryConfig::default()
        };
        let (_layer, exporter) = init_telemetry(&config).unwrap();
        assert_eq!(exporter.url().as_str(), "https://collector.example/api/v2/otlp/v1/traces");
    }
}
