//! Upstream API key resolution.

use thiserror::Error;

use crate::config::UpstreamConfig;

/// A format-checked upstream API key. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("upstream API key is not configured")]
    Missing,

    #[error("upstream API key does not start with the expected prefix '{0}'")]
    Malformed(String),
}

/// Resolve the configured key, checking its prefix.
pub fn resolve_api_key(config: &UpstreamConfig) -> Result<ApiKey, SecretError> {
    let key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(SecretError::Missing)?;

    if !key.starts_with(&config.api_key_prefix) || key.len() == config.api_key_prefix.len() {
        return Err(SecretError::Malformed(config.api_key_prefix.clone()));
    }

    Ok(ApiKey(key.to_string()))
}
