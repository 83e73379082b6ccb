//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the document store project id.
pub const ENV_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";
/// Environment variable holding the service account email.
pub const ENV_CLIENT_EMAIL: &str = "FIREBASE_CLIENT_EMAIL";
/// Environment variable holding the service account private key.
pub const ENV_PRIVATE_KEY: &str = "FIREBASE_PRIVATE_KEY";
/// Environment variable holding the upstream API key.
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration for process start-up.
///
/// Reads the TOML file when one is given (defaults otherwise), overlays the
/// environment, then validates. The result is never modified afterwards.
pub fn load(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file, without the
/// environment overlay.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let config = parse_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay connection parameters and the upstream secret from the
/// environment. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(project_id) = get(ENV_PROJECT_ID) {
        config.document_store.project_id = project_id;
    }
    if let Some(client_email) = get(ENV_CLIENT_EMAIL) {
        config.document_store.client_email = client_email;
    }
    if let Some(private_key) = get(ENV_PRIVATE_KEY) {
        // Keys pasted into env files usually carry escaped newlines.
        config.document_store.private_key = private_key.replace("\\n", "\n");
    }
    if let Some(api_key) = get(ENV_API_KEY) {
        config.upstream.api_key = Some(api_key.trim().to_string());
    }
}
