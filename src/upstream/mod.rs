//! Upstream inference API.
//!
//! # Data Flow
//! ```text
//! RelayConfig.upstream
//!     → secret.rs (resolve + prefix-check the API key, per request)
//!     → client.rs (POST /v1/messages with x-api-key)
//!     → status + JSON body handed back to the relay unchanged
//! ```

pub mod client;
pub mod secret;
pub mod types;

pub use client::{UpstreamClient, UpstreamError};
pub use secret::{resolve_api_key, ApiKey, SecretError};
pub use types::{ChatMessage, MessagesRequest, UpstreamReply};
