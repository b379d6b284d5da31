//! Prompt relay library.
//!
//! Accepts a prompt over HTTP, forwards it to an LLM completion API with the
//! caller's W3C `traceparent` attached (or a freshly minted one), and returns
//! the answer together with that traceparent.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod relay;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::PromptRelayWorkflow;
