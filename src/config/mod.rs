//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay FIREBASE_* / ANTHROPIC_API_KEY from the environment)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc to the relay handler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    AuthConfig, CorsConfig, DocumentStoreConfig, FeatureConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RelayConfig, RelayEndpointConfig, SecurityConfig, SubscriptionConfig,
    TimeoutConfig, TlsConfig, UpstreamConfig,
};
