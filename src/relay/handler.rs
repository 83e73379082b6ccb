//! Relay endpoint handler.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::observability::metrics;
use crate::prompt::{render_analytics_prompt, ANALYTICS_SYSTEM_PROMPT};
use crate::relay::pipeline::{resolve_secret, AuthorizationPipeline, FeatureGate};
use crate::relay::request::{parse_body, validate_fields, RelayVariant, ValidatedRequest};
use crate::upstream::{ChatMessage, MessagesRequest, UpstreamClient, UpstreamError};

/// State shared by relay requests.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub pipeline: AuthorizationPipeline,
    pub gate: Arc<FeatureGate>,
    pub upstream: Arc<UpstreamClient>,
}

/// `POST` on the relay path.
pub async fn relay_handler(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start = Instant::now();

    match relay(&state, &headers, body).await {
        Ok((variant, status, body)) => {
            metrics::record_request(variant, status.as_u16());
            tracing::info!(
                variant = variant,
                status = status.as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Relay request completed"
            );
            (status, Json(body)).into_response()
        }
        Err((variant, error)) => {
            let status = error.status();
            metrics::record_rejection(error.reason());
            metrics::record_request(variant, status.as_u16());
            tracing::error!(
                variant = variant,
                status = status.as_u16(),
                reason = error.reason(),
                error = %error,
                "Relay request failed"
            );
            error.into_response()
        }
    }
}

/// Any method other than `POST` and `OPTIONS` on the relay path.
pub async fn method_not_allowed(method: Method) -> Response {
    let error = RelayError::MethodNotAllowed(method);
    metrics::record_rejection(error.reason());
    tracing::error!(error = %error, "Relay request failed");
    error.into_response()
}

type RelayOutcome = Result<(&'static str, StatusCode, serde_json::Value), (&'static str, RelayError)>;

async fn relay(
    state: &RelayState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> RelayOutcome {
    const UNKNOWN: &str = "unknown";

    let caller = state
        .pipeline
        .authenticate(headers)
        .await
        .map_err(|e| (UNKNOWN, e))?;

    let body = body.map_err(|rejection| {
        (UNKNOWN, body_rejection(rejection, state.config.security.max_body_size))
    })?;
    let request = parse_body(&body)
        .and_then(validate_fields)
        .map_err(|e| (UNKNOWN, e))?;
    let variant = request.variant.name();

    tracing::info!(
        uid = %caller.uid,
        tenant = %request.tenant_ref,
        variant = variant,
        "Relay request accepted"
    );

    let authorized = state
        .pipeline
        .authorize(&state.gate, &caller, &request.tenant_ref)
        .await
        .map_err(|e| (variant, e))?;
    tracing::info!(
        uid = %authorized.caller.uid,
        tenant = %authorized.tenant.id,
        tier = %authorized.tier,
        "Relay request authorized"
    );

    let api_key = resolve_secret(&state.config).map_err(|e| (variant, e))?;
    let upstream_request = build_upstream_request(&state.config, request);

    let reply = state
        .upstream
        .create_message(&api_key, &upstream_request)
        .await
        .map_err(|e| (variant, upstream_error(e)))?;

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    Ok((variant, status, reply.body))
}

/// Shape the upstream call for a validated request.
pub fn build_upstream_request(config: &RelayConfig, request: ValidatedRequest) -> MessagesRequest {
    let upstream = &config.upstream;
    let (default_model, default_max_tokens, system, messages) = match request.variant {
        RelayVariant::Chat(messages) => (
            &upstream.default_model,
            upstream.default_max_tokens,
            None,
            messages,
        ),
        RelayVariant::Analytics(data) => (
            &upstream.analytics_model,
            upstream.analytics_max_tokens,
            Some(ANALYTICS_SYSTEM_PROMPT.to_string()),
            vec![ChatMessage::user(render_analytics_prompt(&data))],
        ),
    };

    MessagesRequest {
        model: request.model.unwrap_or_else(|| default_model.clone()),
        max_tokens: request
            .max_tokens
            .unwrap_or(default_max_tokens)
            .min(upstream.max_tokens_limit),
        system,
        messages,
    }
}

/// Body extraction failures. The size limit comes from `DefaultBodyLimit`.
fn body_rejection(rejection: BytesRejection, limit: usize) -> RelayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge(limit)
    } else {
        RelayError::InvalidBody(rejection.body_text())
    }
}

fn upstream_error(error: UpstreamError) -> RelayError {
    match error {
        UpstreamError::Status { status, body } => RelayError::Upstream {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            body,
        },
        other => RelayError::UpstreamUnavailable(other.to_string()),
    }
}
