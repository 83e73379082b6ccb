//! Service-account access tokens.
//!
//! Signs an RS256 assertion with the configured private key and exchanges it
//! at the token endpoint for a short-lived bearer token. The token is reused
//! until shortly before it expires.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::DocumentStoreConfig;
use crate::store::StoreError;

const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
/// Tokens this close to expiry are refreshed.
const REFRESH_MARGIN_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: u64,
}

/// Source of bearer tokens for the document and identity APIs.
pub struct ServiceAccountTokens {
    client_email: String,
    key: EncodingKey,
    token_uri: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    /// Build a token source. Fails if the email or key is missing or the key
    /// is not an RSA PEM.
    pub fn new(config: &DocumentStoreConfig, http: reqwest::Client) -> Result<Self, StoreError> {
        if config.client_email.trim().is_empty() {
            return Err(StoreError::Auth("service account email is not configured".into()));
        }
        if config.private_key.trim().is_empty() {
            return Err(StoreError::Auth("service account private key is not configured".into()));
        }

        let key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .map_err(|e| StoreError::Auth(format!("invalid service account private key: {}", e)))?;

        Ok(Self {
            client_email: config.client_email.clone(),
            key,
            token_uri: config.token_uri.clone(),
            http,
            cached: Mutex::new(None),
        })
    }

    /// Current bearer token, fetching a new one when needed.
    pub async fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        let now = unix_now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at > now + REFRESH_MARGIN_SECS {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self, now: u64) -> Result<CachedToken, StoreError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| StoreError::Auth(format!("failed to sign assertion: {}", e)))?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Token endpoint refused service account assertion");
            return Err(StoreError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Service account token refreshed");

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
