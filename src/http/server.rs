//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the relay and health routes
//! - Wire up middleware (request ID, tracing, panics, timeout, body limit)
//! - Answer middleware-generated failures with JSON bodies
//! - Serve on a plain or TLS listener until shutdown is signalled

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, StatusCode},
    middleware::{from_fn_with_state, map_response},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::request::{make_request_span, RequestIdMaker, X_REQUEST_ID};
use crate::http::response::ErrorBody;
use crate::relay::{method_not_allowed, relay_handler, AuthorizationPipeline, FeatureGate, RelayState};
use crate::security::{cors_middleware, Authenticator, CorsPolicy, HeaderAuthenticator};
use crate::store::{DocumentStore, IdentityService, RestStore, StoreError};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Errors building the server's collaborators.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("document store: {0}")]
    Store(#[from] StoreError),

    #[error("upstream client: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("invalid identity header name '{0}'")]
    IdentityHeader(String),
}

/// External collaborators of the relay.
#[derive(Clone)]
pub struct Services {
    pub documents: Arc<dyn DocumentStore>,
    pub identities: Arc<dyn IdentityService>,
    pub authenticator: Arc<dyn Authenticator>,
    pub upstream: Arc<UpstreamClient>,
}

impl Services {
    /// Production wiring: REST document store, header identity, HTTPS upstream.
    pub fn from_config(config: &RelayConfig) -> Result<Self, StartupError> {
        let store = Arc::new(RestStore::new(config)?);
        let header = HeaderName::from_bytes(config.auth.identity_header.as_bytes())
            .map_err(|_| StartupError::IdentityHeader(config.auth.identity_header.clone()))?;

        Ok(Self {
            documents: store.clone(),
            identities: store,
            authenticator: Arc::new(HeaderAuthenticator::new(header)),
            upstream: Arc::new(UpstreamClient::new(config)?),
        })
    }
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<RelayConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig, services: Services) -> Self {
        let config = Arc::new(config);
        let state = RelayState {
            config: config.clone(),
            pipeline: AuthorizationPipeline::new(
                services.authenticator,
                services.identities,
                services.documents,
            ),
            gate: Arc::new(FeatureGate::from_config(&config)),
            upstream: services.upstream,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The timeout sits inside the CORS layer so a timed-out relay request
    /// still carries the CORS headers. Oversized bodies are rejected by the
    /// handler's extractor for the same reason.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: RelayState) -> Router {
        let cors = Arc::new(CorsPolicy::new(&config.cors, &config.auth.identity_header));
        let relay = post(relay_handler)
            .fallback(method_not_allowed)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(map_response(timeout_body))
            .layer(from_fn_with_state(cors, cors_middleware));

        Router::new()
            .route(&config.relay.path, relay)
            .route("/health", get(health))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, RequestIdMaker))
    }

    /// The router, for serving or for driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on a plain TCP listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, path = %self.config.relay.path, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS until `shutdown` fires. In-flight requests get
    /// up to the request timeout to finish.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, path = %self.config.relay.path, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let grace = Duration::from_secs(self.config.timeouts.request_secs);
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTPS server draining");
            drain.graceful_shutdown(Some(grace));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Give the timeout layer's empty 408 a JSON body. Relayed upstream 408s
/// already carry a content type and pass through untouched.
async fn timeout_body(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT
        || response.headers().contains_key(header::CONTENT_TYPE)
    {
        return response;
    }
    tracing::error!("Relay request timed out");

    (
        StatusCode::REQUEST_TIMEOUT,
        Json(ErrorBody::new("Request timeout").with_message("The request took too long to complete")),
    )
        .into_response()
}

/// Turn a handler panic into a generic 500.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("Internal server error")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_panic_body_is_generic() {
        let response = handle_panic(Box::new("secret detail".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert!(!body.to_string().contains("secret detail"));
    }

    #[tokio::test]
    async fn test_timeout_gets_json_body() {
        let response = timeout_body(StatusCode::REQUEST_TIMEOUT.into_response()).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Request timeout");
    }

    #[tokio::test]
    async fn test_relayed_timeout_untouched() {
        let upstream = json!({ "type": "error", "error": { "type": "timeout" } });
        let relayed = (StatusCode::REQUEST_TIMEOUT, Json(upstream.clone())).into_response();

        let response = timeout_body(relayed).await;
        assert_eq!(body_json(response).await, upstream);
    }
}
