//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, token limits ordered)
//! - Check that addresses, URLs and header names parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Secrets are not checked here; a missing upstream key is a per-request
//!   failure so the rest of the service stays observable

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub reason: String,
}

impl ValidationError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::new("cors.allowed_origins", "at least one origin is required"));
    }
    for origin in &config.cors.allowed_origins {
        if !is_bare_origin(origin) {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{}' is not a bare origin (scheme://host[:port])", origin),
            ));
        }
    }

    if HeaderName::from_bytes(config.auth.identity_header.as_bytes()).is_err() {
        errors.push(ValidationError::new(
            "auth.identity_header",
            format!("'{}' is not a valid header name", config.auth.identity_header),
        ));
    }

    if config.subscription.claim.trim().is_empty() {
        errors.push(ValidationError::new("subscription.claim", "must not be empty"));
    }
    if config.subscription.tiers.is_empty() {
        errors.push(ValidationError::new("subscription.tiers", "at least one tier is required"));
    }

    if config.feature.flag.trim().is_empty() {
        errors.push(ValidationError::new("feature.flag", "must not be empty"));
    }
    if config.feature.tenant_collection.trim().is_empty() {
        errors.push(ValidationError::new("feature.tenant_collection", "must not be empty"));
    }

    for (field, value) in [
        ("document_store.documents_url", &config.document_store.documents_url),
        ("document_store.identity_url", &config.document_store.identity_url),
        ("document_store.token_uri", &config.document_store.token_uri),
        ("upstream.base_url", &config.upstream.base_url),
    ] {
        if url::Url::parse(value).is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not a valid URL", value)));
        }
    }

    let upstream = &config.upstream;
    if upstream.max_tokens_limit == 0 {
        errors.push(ValidationError::new("upstream.max_tokens_limit", "must be greater than 0"));
    }
    for (field, value) in [
        ("upstream.default_max_tokens", upstream.default_max_tokens),
        ("upstream.analytics_max_tokens", upstream.analytics_max_tokens),
    ] {
        if value == 0 || value > upstream.max_tokens_limit {
            errors.push(ValidationError::new(
                field,
                format!("must be between 1 and max_tokens_limit ({})", upstream.max_tokens_limit),
            ));
        }
    }
    if upstream.default_model.trim().is_empty() {
        errors.push(ValidationError::new("upstream.default_model", "must not be empty"));
    }
    if upstream.analytics_model.trim().is_empty() {
        errors.push(ValidationError::new("upstream.analytics_model", "must not be empty"));
    }

    if !config.relay.path.starts_with('/') {
        errors.push(ValidationError::new("relay.path", "must start with '/'"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// True for `scheme://host[:port]` with nothing after the authority.
fn is_bare_origin(origin: &str) -> bool {
    match url::Url::parse(origin) {
        Ok(url) => {
            url.host_str().is_some()
                && matches!(url.scheme(), "http" | "https")
                && url.path() == "/"
                && !origin.ends_with('/')
                && url.query().is_none()
        }
        Err(_) => false,
    }
}
