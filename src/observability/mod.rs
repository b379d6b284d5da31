//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → spans named after workflow steps
//!
//! trace_context.rs decides the traceparent each request carries.
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → telemetry.rs → external trace collector (optional)
//! ```
//!
//! # Design Decisions
//! - The traceparent flows through every span of a request
//! - Metrics are cheap (atomic increments)
//! - Telemetry is optional and never fails a request

pub mod logging;
pub mod metrics;
pub mod telemetry;
pub mod trace_context;

pub use trace_context::{TraceParent, TRACEPARENT};
