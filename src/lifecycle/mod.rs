//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → HTTP server stops accepting, drains in-flight requests
//!               → telemetry exporter flushes its last batch
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown out to every long-running task
//! - Startup order lives in main: config, logging, telemetry, metrics, server

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
