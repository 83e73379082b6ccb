//! Caller authentication.
//!
//! The relay only needs a user id. How it is obtained sits behind
//! [`Authenticator`], so the header-based scheme can be replaced by verified
//! tokens without touching the authorization pipeline.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};
use thiserror::Error;

/// The authenticated principal making a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerIdentity {
    pub uid: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing {0} header")]
    Missing(String),

    #[error("invalid {0} header")]
    Invalid(String),
}

/// Resolves the caller from request headers.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, AuthError>;
}

/// Trusts a user id supplied in a request header, as set by the fronting
/// application.
#[derive(Debug, Clone)]
pub struct HeaderAuthenticator {
    header: HeaderName,
}

impl HeaderAuthenticator {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }

    /// Header name this authenticator reads.
    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

#[async_trait]
impl Authenticator for HeaderAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, AuthError> {
        let value = headers
            .get(&self.header)
            .ok_or_else(|| AuthError::Missing(self.header.to_string()))?;

        let uid = value
            .to_str()
            .map_err(|_| AuthError::Invalid(self.header.to_string()))?
            .trim();

        if uid.is_empty() {
            return Err(AuthError::Missing(self.header.to_string()));
        }

        Ok(CallerIdentity { uid: uid.to_string() })
    }
}
