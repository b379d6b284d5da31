//! Provider error types.

use thiserror::Error;

/// Longest provider error body kept in an error message.
const MAX_BODY_CHARS: usize = 512;

/// Errors raised by a completion provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, TLS or protocol failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded the configured provider timeout.
    #[error("Provider request timed out")]
    Timeout,

    /// The provider answered with a non-success status.
    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 2xx but the body was not JSON.
    #[error("Malformed provider response: {0}")]
    Decode(String),

    /// A trace header could not be encoded.
    #[error("Invalid outbound header: {0}")]
    InvalidHeader(String),
}

impl ProviderError {
    /// Classify a transport failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(err.to_string())
        }
    }

    /// Build a status error, truncating long bodies.
    pub fn status(status: u16, body: &str) -> Self {
        let body = if body.chars().count() > MAX_BODY_CHARS {
            let mut cut: String = body.chars().take(MAX_BODY_CHARS).collect();
            cut.push_str("...");
            cut
        } else {
            body.to_string()
        };
        ProviderError::Status { status, body }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_body_truncated() {
        let long = "x".repeat(2000);
        match ProviderError::status(500, &long) {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_BODY_CHARS + 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_status_message() {
        let err = ProviderError::status(401, "invalid api key");
        assert_eq!(err.to_string(), "Provider returned status 401: invalid api key");
    }
}
