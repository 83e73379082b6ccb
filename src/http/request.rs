//! Request correlation.
//!
//! # Responsibilities
//! - Name the request ID header
//! - Open one tracing span per request carrying the request ID
//!
//! # Design Decisions
//! - IDs are UUID v4 from [`RequestIdMaker`], unless the caller sent one
//! - The same ID is echoed on the response by `PropagateRequestIdLayer`

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID header name.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a UUID v4 for requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMaker;

impl MakeRequestId for RequestIdMaker {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of a request or response, if set.
pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(&X_REQUEST_ID).and_then(|v| v.to_str().ok())
}

/// Span for one HTTP request. Every log line emitted while handling the
/// request carries its ID.
pub fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = request_id(request.headers()).unwrap_or("unknown"),
        method = %request.method(),
        path = %request.uri().path(),
    )
}
