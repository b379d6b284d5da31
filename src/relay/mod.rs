//! Prompt relay subsystem.
//!
//! # Data Flow
//! ```text
//! POST /ask (prompt, optional traceparent header)
//!     → workflow.rs
//!         generate_trace_id   (only when no inbound traceparent)
//!         process_prompt
//!             generate_response → CompletionProvider (traceparent header attached)
//!         extract answer (fallback: "No response content")
//!     → RelayOutcome { response, traceparent }
//! ```
//!
//! # Design Decisions
//! - Stateless: each call is independent, nothing is shared but the provider handle
//! - Inbound traceparent is echoed verbatim, never validated
//! - Provider failures are logged and propagated, never retried

pub mod workflow;

pub use workflow::{extract_answer, PromptRelayWorkflow, RelayError, RelayOutcome, NO_RESPONSE_CONTENT};
