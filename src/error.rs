//! Error taxonomy for the relay endpoint.
//!
//! Every failure a caller can observe is a [`RelayError`]. Subsystem errors
//! ([`StoreError`], [`UpstreamError`]) are translated where they occur, so a
//! missing tenant and a missing user reach the caller as different variants
//! instead of being recovered from a generic error later.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use thiserror::Error;

use crate::http::response::ErrorBody;
use crate::store::StoreError;

/// A terminal failure of one relay request. None of these are retried.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("origin '{0}' is not allowed")]
    OriginNotAllowed(String),

    #[error("method {0} is not allowed")]
    MethodNotAllowed(Method),

    #[error("caller identity missing")]
    Unauthenticated,

    #[error("request body is not a JSON object: {0}")]
    InvalidBody(String),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("caller has no entitled subscription tier")]
    SubscriptionRequired { message: String },

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("tenant '{0}' not found")]
    TenantNotFound(String),

    #[error("caller does not own tenant '{0}'")]
    NotOwner(String),

    #[error("feature disabled for tenant '{0}'")]
    FeatureDisabled(String),

    #[error("tenant settings unreadable: {0}")]
    InvalidSettings(String),

    #[error("service misconfigured: {0}")]
    Misconfigured(String),

    #[error("document store error: {0}")]
    Store(#[from] StoreError),

    #[error("upstream returned {status}")]
    Upstream { status: StatusCode, body: Value },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl RelayError {
    /// HTTP status reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::OriginNotAllowed(_) => StatusCode::FORBIDDEN,
            RelayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            RelayError::InvalidBody(_)
            | RelayError::MissingField(_)
            | RelayError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::SubscriptionRequired { .. } | RelayError::NotOwner(_) => {
                StatusCode::FORBIDDEN
            }
            RelayError::UserNotFound(_) | RelayError::TenantNotFound(_) => StatusCode::NOT_FOUND,
            RelayError::FeatureDisabled(_) => StatusCode::BAD_REQUEST,
            RelayError::InvalidSettings(_)
            | RelayError::Misconfigured(_)
            | RelayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Upstream { status, .. } => *status,
            RelayError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label used for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            RelayError::OriginNotAllowed(_) => "origin",
            RelayError::MethodNotAllowed(_) => "method",
            RelayError::Unauthenticated => "unauthenticated",
            RelayError::InvalidBody(_) => "invalid_body",
            RelayError::PayloadTooLarge(_) => "payload_too_large",
            RelayError::MissingField(_) | RelayError::InvalidField { .. } => "invalid_field",
            RelayError::SubscriptionRequired { .. } => "subscription",
            RelayError::UserNotFound(_) => "user_not_found",
            RelayError::TenantNotFound(_) => "tenant_not_found",
            RelayError::NotOwner(_) => "not_owner",
            RelayError::FeatureDisabled(_) => "feature_disabled",
            RelayError::InvalidSettings(_) => "invalid_settings",
            RelayError::Misconfigured(_) => "misconfigured",
            RelayError::Store(_) => "store",
            RelayError::Upstream { .. } => "upstream_status",
            RelayError::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }

    /// Body sent to the caller. 500-class variants carry a generic message;
    /// the cause is only logged.
    fn body(&self) -> ErrorBody {
        match self {
            RelayError::OriginNotAllowed(_) => ErrorBody::new("Origin not allowed"),
            RelayError::MethodNotAllowed(_) => {
                ErrorBody::new("Method not allowed").with_message("Only POST is supported")
            }
            RelayError::Unauthenticated => {
                ErrorBody::new("Unauthorized").with_message("Missing user identity")
            }
            RelayError::InvalidBody(detail) => {
                ErrorBody::new("Invalid JSON body").with_message(detail.clone())
            }
            RelayError::PayloadTooLarge(limit) => ErrorBody::new("Payload too large")
                .with_message(format!("Request body must not exceed {} bytes", limit)),
            RelayError::MissingField(field) => ErrorBody::new("Missing required field")
                .with_message(format!("{} is required", field)),
            RelayError::InvalidField { field, reason } => ErrorBody::new("Invalid field")
                .with_message(format!("{} {}", field, reason)),
            RelayError::SubscriptionRequired { message } => {
                ErrorBody::new("Subscription required").with_message(message.clone())
            }
            RelayError::UserNotFound(_) => ErrorBody::new("User not found"),
            RelayError::TenantNotFound(_) => ErrorBody::new("Restaurant not found"),
            RelayError::NotOwner(_) => ErrorBody::new("Access denied")
                .with_message("You do not have access to this restaurant"),
            RelayError::FeatureDisabled(_) => ErrorBody::new("AI Analytics not enabled")
                .with_message("Enable AI Analytics in your restaurant settings to use this feature"),
            RelayError::InvalidSettings(_) => ErrorBody::new("Invalid restaurant settings"),
            RelayError::Misconfigured(_) => ErrorBody::new("Service misconfigured")
                .with_message("The AI service is not configured. Please contact support."),
            RelayError::Store(_) => ErrorBody::new("Internal server error"),
            RelayError::Upstream { .. } => ErrorBody::new("Upstream API error"),
            RelayError::UpstreamUnavailable(_) => ErrorBody::new("Upstream request failed"),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            // Upstream error payloads are relayed verbatim.
            RelayError::Upstream { body, .. } => (status, axum::Json(body)).into_response(),
            other => (status, axum::Json(other.body())).into_response(),
        }
    }
}
