//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the provider is reachable in principle (URL, credentials)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Telemetry settings are not checked here; a broken collector never
//!   prevents the relay from starting

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("provider.base_url '{url}' is invalid: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("provider.api_key is empty (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.request_secs ({request_secs}) must exceed timeouts.provider_secs ({provider_secs})")]
    RequestTimeoutTooShort { request_secs: u64, provider_secs: u64 },

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    match Url::parse(&config.provider.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::BaseUrl {
            url: config.provider.base_url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::BaseUrl {
            url: config.provider.base_url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.provider.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }

    let timeouts = [
        ("request_secs", config.timeouts.request_secs),
        ("connect_secs", config.timeouts.connect_secs),
        ("provider_secs", config.timeouts.provider_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    // Provider failures must be reported before the inbound timeout fires.
    let (request_secs, provider_secs) = (config.timeouts.request_secs, config.timeouts.provider_secs);
    if request_secs > 0 && provider_secs > 0 && request_secs <= provider_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs,
            provider_secs,
        });
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
