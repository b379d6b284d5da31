//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, reason } => write!(f, "Invalid {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Build the effective configuration: optional TOML file, then process
/// environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on a configuration.
///
/// `lookup` abstracts the environment so callers can supply a map.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("OPENAI_API_KEY") {
        config.provider.api_key = key;
    }
    if let Some(addr) = get("RELAY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(kind) = get("RELAY_PROVIDER") {
        config.provider.kind = kind
            .parse()
            .map_err(|reason| ConfigError::Env { var: "RELAY_PROVIDER", reason })?;
    }
    if let Some(model) = get("RELAY_MODEL") {
        config.provider.model = Some(model);
    }
    if let Some(endpoint) = get("TELEMETRY_ENDPOINT") {
        config.telemetry.endpoint = endpoint;
        config.telemetry.enabled = true;
    }
    if let Some(token) = get("TELEMETRY_TOKEN").or_else(|| get("DT_ACCESS_TOKEN")) {
        config.telemetry.token = token;
    }
    if let Some(name) = get("TELEMETRY_APP_NAME") {
        config.telemetry.app_name = name;
    }

    Ok(())
}
