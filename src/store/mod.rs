//! External record lookups.
//!
//! # Data Flow
//! ```text
//! relay pipeline
//!     → IdentityService::lookup_user (caller's subscription claims)
//!     → DocumentStore::get_tenant    (owner + settings blob)
//!
//! backends:
//!     rest.rs        document/identity REST APIs, service-account bearer
//!     credentials.rs signs the service-account JWT, caches the access token
//!     memory.rs      fixed records for tests and local runs
//! ```
//!
//! # Design Decisions
//! - Records are read-only and fetched fresh on every request
//! - "Not found" is a typed error so callers can tell it apart from outages
//! - Implementations must not retry

pub mod credentials;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::InMemoryStore;
pub use rest::RestStore;

/// Tenant document, as stored by the application.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantRecord {
    /// Document id.
    pub id: String,
    /// User id of the tenant's owner.
    pub owner_id: String,
    /// Serialized JSON settings blob, if any.
    pub settings: Option<String>,
}

/// User record held by the identity service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserRecord {
    pub uid: String,
    /// Custom claims attached to the user (subscription tier lives here).
    pub claims: Map<String, Value>,
}

impl UserRecord {
    /// String value of a claim, if present.
    pub fn claim_str(&self, claim: &str) -> Option<&str> {
        self.claims.get(claim).and_then(Value::as_str)
    }
}

/// Errors from the document store or identity service.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Credentials missing, malformed or refused.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The service answered with an unexpected status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Read access to tenant documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a tenant document by id from `collection`.
    async fn get_tenant(&self, collection: &str, id: &str) -> Result<TenantRecord, StoreError>;
}

/// Read access to user records.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Fetch a user by id.
    async fn lookup_user(&self, uid: &str) -> Result<UserRecord, StoreError>;
}
