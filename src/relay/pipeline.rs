//! Authorization pipeline shared by every request variant.
//!
//! ```text
//! authenticate   caller identity from headers            → 401
//! authorize      subscription tier on the user record    → 404 / 403
//!                tenant document                         → 404
//!                tenant owner == caller                  → 403
//!                settings parse + feature flag true      → 500 / 400
//! resolve_secret upstream API key present + prefixed     → 500
//! ```
//!
//! Each step short-circuits; lookups happen in order and are never retried.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde_json::Value;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::security::{Authenticator, CallerIdentity};
use crate::store::{DocumentStore, IdentityService, StoreError, TenantRecord};
use crate::upstream::{resolve_api_key, ApiKey};

/// Requirements a caller and tenant must meet to use a feature.
#[derive(Debug, Clone)]
pub struct FeatureGate {
    /// Collection the tenant documents live in.
    pub tenant_collection: String,
    /// Settings key that must be `true`.
    pub flag: String,
    /// User claim holding the subscription label.
    pub claim: String,
    /// Labels entitled to the feature.
    pub tiers: Vec<String>,
    /// Shown to callers without an entitled label.
    pub upgrade_message: String,
}

impl FeatureGate {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            tenant_collection: config.feature.tenant_collection.clone(),
            flag: config.feature.flag.clone(),
            claim: config.subscription.claim.clone(),
            tiers: config.subscription.tiers.clone(),
            upgrade_message: config.subscription.upgrade_message.clone(),
        }
    }
}

/// Result of a successful authorization.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub caller: CallerIdentity,
    pub tenant: TenantRecord,
    pub tier: String,
}

/// Runs identity, entitlement, ownership and feature checks.
#[derive(Clone)]
pub struct AuthorizationPipeline {
    authenticator: Arc<dyn Authenticator>,
    identities: Arc<dyn IdentityService>,
    documents: Arc<dyn DocumentStore>,
}

impl AuthorizationPipeline {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        identities: Arc<dyn IdentityService>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            authenticator,
            identities,
            documents,
        }
    }

    /// Resolve the caller. No external lookups happen before this succeeds.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, RelayError> {
        match self.authenticator.authenticate(headers).await {
            Ok(caller) => {
                tracing::info!(uid = %caller.uid, "Caller identified");
                Ok(caller)
            }
            Err(e) => {
                tracing::error!(error = %e, "Caller identity missing");
                Err(RelayError::Unauthenticated)
            }
        }
    }

    /// Check the caller's subscription, the tenant's ownership and its
    /// feature flag, in that order.
    pub async fn authorize(
        &self,
        gate: &FeatureGate,
        caller: &CallerIdentity,
        tenant_ref: &str,
    ) -> Result<Authorized, RelayError> {
        let tier = self.check_subscription(gate, caller).await?;
        let tenant = self.fetch_tenant(gate, tenant_ref).await?;

        if tenant.owner_id != caller.uid {
            tracing::error!(uid = %caller.uid, tenant = %tenant_ref, "Caller does not own tenant");
            return Err(RelayError::NotOwner(tenant_ref.to_string()));
        }
        tracing::info!(uid = %caller.uid, tenant = %tenant_ref, "Tenant ownership verified");

        check_feature_flag(gate, &tenant)?;
        tracing::info!(tenant = %tenant_ref, flag = %gate.flag, "Feature enabled for tenant");

        Ok(Authorized {
            caller: caller.clone(),
            tenant,
            tier,
        })
    }

    async fn check_subscription(
        &self,
        gate: &FeatureGate,
        caller: &CallerIdentity,
    ) -> Result<String, RelayError> {
        let user = match self.identities.lookup_user(&caller.uid).await {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => {
                tracing::error!(uid = %caller.uid, "Caller has no user record");
                return Err(RelayError::UserNotFound(caller.uid.clone()));
            }
            Err(e) => {
                tracing::error!(uid = %caller.uid, error = %e, "User lookup failed");
                return Err(RelayError::Store(e));
            }
        };

        match user.claim_str(&gate.claim) {
            Some(tier) if gate.tiers.iter().any(|t| t == tier) => {
                tracing::info!(uid = %caller.uid, tier = %tier, "Subscription verified");
                Ok(tier.to_string())
            }
            other => {
                tracing::error!(uid = %caller.uid, tier = ?other, "No entitled subscription tier");
                Err(RelayError::SubscriptionRequired {
                    message: gate.upgrade_message.clone(),
                })
            }
        }
    }

    async fn fetch_tenant(
        &self,
        gate: &FeatureGate,
        tenant_ref: &str,
    ) -> Result<TenantRecord, RelayError> {
        match self.documents.get_tenant(&gate.tenant_collection, tenant_ref).await {
            Ok(tenant) => {
                tracing::info!(tenant = %tenant_ref, "Tenant record loaded");
                Ok(tenant)
            }
            Err(StoreError::NotFound { .. }) => {
                tracing::error!(tenant = %tenant_ref, "Tenant not found");
                Err(RelayError::TenantNotFound(tenant_ref.to_string()))
            }
            Err(e) => {
                tracing::error!(tenant = %tenant_ref, error = %e, "Tenant lookup failed");
                Err(RelayError::Store(e))
            }
        }
    }
}

/// The tenant's settings blob must be a JSON object with `gate.flag: true`.
pub fn check_feature_flag(gate: &FeatureGate, tenant: &TenantRecord) -> Result<(), RelayError> {
    let raw = tenant.settings.as_deref().map(str::trim).unwrap_or("");
    if raw.is_empty() {
        tracing::error!(tenant = %tenant.id, "Tenant has no settings");
        return Err(RelayError::FeatureDisabled(tenant.id.clone()));
    }

    let settings = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(settings)) => settings,
        Ok(_) => {
            tracing::error!(tenant = %tenant.id, "Tenant settings are not an object");
            return Err(RelayError::InvalidSettings(tenant.id.clone()));
        }
        Err(e) => {
            tracing::error!(tenant = %tenant.id, error = %e, "Tenant settings are not valid JSON");
            return Err(RelayError::InvalidSettings(tenant.id.clone()));
        }
    };

    match settings.get(&gate.flag) {
        Some(Value::Bool(true)) => Ok(()),
        other => {
            tracing::error!(tenant = %tenant.id, flag = %gate.flag, value = ?other, "Feature not enabled");
            Err(RelayError::FeatureDisabled(tenant.id.clone()))
        }
    }
}

/// Resolve the upstream API key for this request.
pub fn resolve_secret(config: &RelayConfig) -> Result<ApiKey, RelayError> {
    match resolve_api_key(&config.upstream) {
        Ok(key) => {
            tracing::info!("Upstream credential resolved");
            Ok(key)
        }
        Err(e) => {
            tracing::error!(error = %e, "Upstream credential unusable");
            Err(RelayError::Misconfigured(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> FeatureGate {
        FeatureGate::from_config(&RelayConfig::default())
    }

    fn tenant(settings: Option<&str>) -> TenantRecord {
        TenantRecord {
            id: "r1".into(),
            owner_id: "u1".into(),
            settings: settings.map(String::from),
        }
    }

    #[test]
    fn test_flag_enabled() {
        assert!(check_feature_flag(&gate(), &tenant(Some(r#"{"aiAnalyticsEnabled": true}"#))).is_ok());
    }

    #[test]
    fn test_flag_false_or_missing() {
        for settings in [
            Some(r#"{"aiAnalyticsEnabled": false}"#),
            Some(r#"{"aiAnalyticsEnabled": "true"}"#),
            Some(r#"{"theme": "dark"}"#),
            None,
        ] {
            assert!(matches!(
                check_feature_flag(&gate(), &tenant(settings)),
                Err(RelayError::FeatureDisabled(_))
            ));
        }
    }

    #[test]
    fn test_unparseable_settings() {
        for settings in ["{broken", "[true]"] {
            assert!(matches!(
                check_feature_flag(&gate(), &tenant(Some(settings))),
                Err(RelayError::InvalidSettings(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_authorize_reports_tier_and_tenant() {
        let store = Arc::new(crate::store::InMemoryStore::new());
        store.put_user("u1", &[("tier", "premium")]);
        store.put_tenant("restaurants", tenant(Some(r#"{"aiAnalyticsEnabled": true}"#)));
        let pipeline = AuthorizationPipeline::new(
            Arc::new(crate::security::HeaderAuthenticator::new(
                axum::http::HeaderName::from_static("x-user-id"),
            )),
            store.clone(),
            store,
        );

        let caller = CallerIdentity { uid: "u1".into() };
        let authorized = pipeline.authorize(&gate(), &caller, "r1").await.unwrap();

        assert_eq!(authorized.tier, "premium");
        assert_eq!(authorized.tenant.id, "r1");
        assert_eq!(authorized.caller, caller);
    }

    #[test]
    fn test_secret_resolution() {
        let mut config = RelayConfig::default();
        assert!(matches!(resolve_secret(&config), Err(RelayError::Misconfigured(_))));

        config.upstream.api_key = Some("sk-ant-api03-key".into());
        assert!(resolve_secret(&config).is_ok());
    }
}
