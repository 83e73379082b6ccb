//! Origin policy and CORS headers for the relay endpoint.
//!
//! # Responsibilities
//! - Answer preflight (`OPTIONS`) requests without any other checks
//! - Reject requests from origins outside the allow-list
//! - Stamp CORS headers on every response, errors included
//!
//! # Design Decisions
//! - Origin comes from `Origin`, falling back to the origin of `Referer`
//! - Requests without an origin (server-to-server) are let through and get
//!   the default origin header
//! - Unlisted origins are rejected unless `allow_unlisted_origins` is set

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;
use crate::error::RelayError;
use crate::observability::metrics;

const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Outcome of checking a request's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// Origin is on the allow-list; echo it back.
    Allowed(String),
    /// No origin, or an unlisted one let through; answer with the default.
    Fallback,
    /// Unlisted origin; reject.
    Rejected(String),
}

/// Compiled origin policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Vec<String>,
    default_origin: String,
    allow_unlisted: bool,
    allow_headers: String,
}

impl CorsPolicy {
    /// Build the policy. `identity_header` is added to the allowed request
    /// headers so browsers may send it.
    pub fn new(config: &CorsConfig, identity_header: &str) -> Self {
        let default_origin = config
            .allowed_origins
            .first()
            .cloned()
            .unwrap_or_else(|| "*".to_string());

        Self {
            allowed: config.allowed_origins.clone(),
            default_origin,
            allow_unlisted: config.allow_unlisted_origins,
            allow_headers: format!("Content-Type, Authorization, {}", identity_header),
        }
    }

    /// Classify an origin.
    pub fn decide(&self, origin: Option<&str>) -> OriginDecision {
        match origin {
            None => OriginDecision::Fallback,
            Some(origin) if self.allowed.iter().any(|o| o == origin) => {
                OriginDecision::Allowed(origin.to_string())
            }
            Some(_) if self.allow_unlisted => OriginDecision::Fallback,
            Some(origin) => OriginDecision::Rejected(origin.to_string()),
        }
    }

    /// Add CORS headers for the given decision.
    pub fn apply(&self, decision: &OriginDecision, headers: &mut HeaderMap) {
        let origin = match decision {
            OriginDecision::Allowed(origin) => origin.as_str(),
            OriginDecision::Fallback | OriginDecision::Rejected(_) => self.default_origin.as_str(),
        };

        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        if let Ok(value) = HeaderValue::from_str(&self.allow_headers) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
}

/// Origin of the request: `Origin`, else scheme://host[:port] of `Referer`.
pub fn request_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        let origin = origin.trim();
        if !origin.is_empty() && origin != "null" {
            return Some(origin.to_string());
        }
    }

    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok())?;
    let url = url::Url::parse(referer.trim()).ok()?;
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

/// Middleware enforcing the origin policy on the relay route.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request_origin(request.headers());
    let decision = policy.decide(origin.as_deref());

    // Preflight always succeeds; the real request is checked when it arrives.
    if request.method() == Method::OPTIONS {
        tracing::debug!(origin = ?origin, "Answering CORS preflight");
        let mut response = StatusCode::OK.into_response();
        policy.apply(&decision, response.headers_mut());
        return response;
    }

    let mut response = match &decision {
        OriginDecision::Rejected(origin) => {
            tracing::error!(origin = %origin, "Request from disallowed origin");
            let error = RelayError::OriginNotAllowed(origin.clone());
            metrics::record_rejection(error.reason());
            error.into_response()
        }
        OriginDecision::Allowed(_) | OriginDecision::Fallback => next.run(request).await,
    };

    policy.apply(&decision, response.headers_mut());
    response
}
