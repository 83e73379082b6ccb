//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening (body limits).
    pub security: SecurityConfig,

    /// Cross-origin policy for browser callers.
    pub cors: CorsConfig,

    /// How the caller identity is extracted.
    pub auth: AuthConfig,

    /// Subscription tiers entitled to the relayed feature.
    pub subscription: SubscriptionConfig,

    /// Per-tenant feature flag gating the relay.
    pub feature: FeatureConfig,

    /// Document store / identity service connection.
    pub document_store: DocumentStoreConfig,

    /// Upstream inference API.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Relay endpoint settings.
    pub relay: RelayEndpointConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one inbound request, in seconds.
    pub request_secs: u64,

    /// Timeout applied to each outbound call, in seconds.
    pub upstream_secs: u64,

    /// Outbound connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 120,
            upstream_secs: 90,
            connect_secs: 5,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the relay. The first entry doubles as the
    /// default `Access-Control-Allow-Origin` value.
    pub allowed_origins: Vec<String>,

    /// Let requests from unlisted origins through with the default origin
    /// header instead of rejecting them.
    pub allow_unlisted_origins: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_unlisted_origins: false,
        }
    }
}

/// Caller authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header carrying the caller's user id.
    pub identity_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_header: "x-user-id".to_string(),
        }
    }
}

/// Subscription requirement.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Custom claim on the user record holding the subscription label.
    pub claim: String,

    /// Labels entitled to the feature.
    pub tiers: Vec<String>,

    /// Message shown to callers without an entitled tier.
    pub upgrade_message: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            claim: "tier".to_string(),
            tiers: vec!["pro".to_string(), "premium".to_string()],
            upgrade_message: "AI Analytics requires a Pro or Premium subscription. \
                              Upgrade your plan to unlock this feature."
                .to_string(),
        }
    }
}

/// Tenant feature flag settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Collection holding tenant documents.
    pub tenant_collection: String,

    /// Key inside the tenant settings blob that enables the feature.
    pub flag: String,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            tenant_collection: "restaurants".to_string(),
            flag: "aiAnalyticsEnabled".to_string(),
        }
    }
}

/// Document store and identity service connection.
///
/// `project_id`, `client_email` and `private_key` are normally supplied
/// through the environment; see [`crate::config::loader::apply_env_overrides`].
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    /// Project the documents and users live in.
    pub project_id: String,

    /// Service account email used to sign access token requests.
    pub client_email: String,

    /// Service account RSA private key (PEM).
    pub private_key: String,

    /// Base URL of the document REST API.
    pub documents_url: String,

    /// Base URL of the identity REST API.
    pub identity_url: String,

    /// OAuth token endpoint.
    pub token_uri: String,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            client_email: String::new(),
            private_key: String::new(),
            documents_url: "https://firestore.googleapis.com".to_string(),
            identity_url: "https://identitytoolkit.googleapis.com".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl std::fmt::Debug for DocumentStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStoreConfig")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("documents_url", &self.documents_url)
            .field("identity_url", &self.identity_url)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Upstream inference API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the inference API.
    pub base_url: String,

    /// Value of the `anthropic-version` header.
    pub api_version: String,

    /// API key. Checked per request; a missing key is reported to callers
    /// as a misconfigured service.
    pub api_key: Option<String>,

    /// Prefix every valid API key starts with.
    pub api_key_prefix: String,

    /// Model used for chat requests that don't name one.
    pub default_model: String,

    /// Token limit for chat requests that don't set one.
    pub default_max_tokens: u32,

    /// Model used for analytics prompts.
    pub analytics_model: String,

    /// Token limit for analytics prompts.
    pub analytics_max_tokens: u32,

    /// Hard ceiling on `max_tokens`, whatever the caller asks for.
    pub max_tokens_limit: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_version: "2023-06-01".to_string(),
            api_key: None,
            api_key_prefix: "sk-ant-".to_string(),
            default_model: "claude-3-5-haiku-20241022".to_string(),
            default_max_tokens: 1024,
            analytics_model: "claude-3-5-sonnet-20241022".to_string(),
            analytics_max_tokens: 2048,
            max_tokens_limit: 4096,
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("analytics_model", &self.analytics_model)
            .field("analytics_max_tokens", &self.analytics_max_tokens)
            .field("max_tokens_limit", &self.max_tokens_limit)
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Relay endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayEndpointConfig {
    /// Path the relay is mounted on.
    pub path: String,
}

impl Default for RelayEndpointConfig {
    fn default() -> Self {
        Self {
            path: "/api/ai".to_string(),
        }
    }
}
