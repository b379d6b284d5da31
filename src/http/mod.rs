//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (body, request ID, inbound traceparent)
//!     → handlers.rs (/, /ask, /health)
//!     → [relay workflow]
//!     → response.rs (JSON body, error → status mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{AskRequest, X_REQUEST_ID};
pub use response::{ApiError, AskResponse, ErrorBody};
pub use server::{AppState, HttpServer};
