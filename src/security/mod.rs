//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight, origin allow-list, CORS headers)
//!     → identity.rs (resolve caller identity)
//!     → Pass to the authorization pipeline
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any check failure
//! - Identity extraction is a trait so the trust model can change

pub mod cors;
pub mod identity;

pub use cors::{cors_middleware, CorsPolicy, OriginDecision};
pub use identity::{AuthError, Authenticator, CallerIdentity, HeaderAuthenticator};
