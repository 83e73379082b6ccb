//! The relay endpoint.
//!
//! # Data Flow
//! ```text
//! POST {relay.path}
//!     → security::cors (origin, preflight)          [route layer]
//!     → handler.rs (method fallback → 405)
//!     → pipeline.rs authenticate (identity header)
//!     → request.rs (JSON body, required fields, variant)
//!     → pipeline.rs authorize (tier, tenant, owner, flag)
//!     → pipeline.rs resolve_secret (API key)
//!     → upstream::client (POST /v1/messages)
//!     → upstream status + body back to the caller
//! ```

pub mod handler;
pub mod pipeline;
pub mod request;

pub use handler::{build_upstream_request, method_not_allowed, relay_handler, RelayState};
pub use pipeline::{check_feature_flag, resolve_secret, AuthorizationPipeline, Authorized, FeatureGate};
pub use request::{parse_body, validate_fields, RelayRequest, RelayVariant, ValidatedRequest};
