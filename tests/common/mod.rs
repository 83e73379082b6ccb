//! Shared utilities for integration tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use ai_relay::config::RelayConfig;
use ai_relay::http::{HttpServer, Services};
use ai_relay::security::HeaderAuthenticator;
use ai_relay::store::{InMemoryStore, TenantRecord};
use ai_relay::upstream::UpstreamClient;

pub const OWNER: &str = "owner-1";
pub const TENANT: &str = "rest-1";
pub const ORIGIN: &str = "http://localhost:3000";
pub const API_KEY: &str = "sk-ant-test-0000";

/// Nothing listens here; connections are refused.
#[allow(dead_code)]
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

/// Config pointing the upstream at `upstream_url`, with a valid key.
pub fn test_config(upstream_url: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.upstream.base_url = upstream_url.to_string();
    config.upstream.api_key = Some(API_KEY.to_string());
    config.timeouts.upstream_secs = 5;
    config.timeouts.connect_secs = 1;
    config
}

/// A store holding one entitled owner and their tenant with the feature on.
pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.put_user(OWNER, &[("tier", "pro")]);
    store.put_tenant(
        "restaurants",
        TenantRecord {
            id: TENANT.to_string(),
            owner_id: OWNER.to_string(),
            settings: Some(r#"{"aiAnalyticsEnabled": true, "currency": "EUR"}"#.to_string()),
        },
    );
    store
}

/// Router wired to the in-memory store.
pub fn build_app(config: RelayConfig, store: Arc<InMemoryStore>) -> Router {
    let services = Services {
        documents: store.clone(),
        identities: store,
        authenticator: Arc::new(HeaderAuthenticator::new(
            config.auth.identity_header.parse().unwrap(),
        )),
        upstream: Arc::new(UpstreamClient::new(&config).unwrap()),
    };
    HttpServer::new(config, services).router()
}

/// Request builder for the relay path with the given identity and origin.
#[allow(dead_code)]
pub fn request_as(method: Method, uid: Option<&str>, origin: &str) -> axum::http::request::Builder {
    let builder = Request::builder()
        .method(method)
        .uri("/api/ai")
        .header("origin", origin)
        .header("content-type", "application/json");
    match uid {
        Some(uid) => builder.header("x-user-id", uid),
        None => builder,
    }
}

/// Request builder preloaded with an allowed origin and the owner's identity.
pub fn relay_request(method: Method) -> axum::http::request::Builder {
    request_as(method, Some(OWNER), ORIGIN)
}

/// `POST /api/ai` with a JSON body as the owner.
pub fn post_json(body: &Value) -> Request<Body> {
    relay_request(Method::POST)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Drive one request through the router.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, headers, body)
}
