//! REST backend for the document store and identity service.
//!
//! Documents are read with the Firestore `documents.get` shape and users with
//! the Identity Toolkit `accounts:lookup` shape. Both calls carry a
//! service-account bearer token from [`ServiceAccountTokens`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{DocumentStoreConfig, RelayConfig};
use crate::store::credentials::ServiceAccountTokens;
use crate::store::{DocumentStore, IdentityService, StoreError, TenantRecord, UserRecord};

/// Field holding the tenant owner's user id.
const OWNER_FIELD: &str = "ownerId";
/// Field holding the serialized settings blob.
const SETTINGS_FIELD: &str = "settings";

/// Document store and identity service reached over HTTPS.
pub struct RestStore {
    http: reqwest::Client,
    config: DocumentStoreConfig,
    tokens: ServiceAccountTokens,
}

impl RestStore {
    /// Build the REST backend. Fails fast if the service account is unusable.
    pub fn new(config: &RelayConfig) -> Result<Self, StoreError> {
        let store = &config.document_store;
        if store.project_id.trim().is_empty() {
            return Err(StoreError::Auth("project id is not configured".into()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.upstream_secs))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let tokens = ServiceAccountTokens::new(store, http.clone())?;

        tracing::info!(
            project_id = %store.project_id,
            client_email = %store.client_email,
            "Document store client initialized"
        );

        Ok(Self {
            http,
            config: store.clone(),
            tokens,
        })
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}/{}",
            self.config.documents_url.trim_end_matches('/'),
            self.config.project_id,
            collection,
            id
        )
    }

    fn lookup_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/accounts:lookup",
            self.config.identity_url.trim_end_matches('/'),
            self.config.project_id
        )
    }
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("project_id", &self.config.project_id)
            .field("documents_url", &self.config.documents_url)
            .finish()
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn get_tenant(&self, collection: &str, id: &str) -> Result<TenantRecord, StoreError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(self.document_url(collection, id))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(StoreError::NotFound { kind: "document", id: id.to_string() })
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::Status { status: status.as_u16(), body });
            }
            _ => {}
        }

        let document: Document = response.json().await?;
        decode_tenant(id, document)
    }
}

#[async_trait]
impl IdentityService for RestStore {
    async fn lookup_user(&self, uid: &str) -> Result<UserRecord, StoreError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.lookup_url())
            .bearer_auth(token)
            .json(&serde_json::json!({ "localId": [uid] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status: status.as_u16(), body });
        }

        let lookup: LookupResponse = response.json().await?;
        decode_user(uid, lookup)
    }
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    custom_attributes: Option<String>,
}

fn decode_tenant(id: &str, document: Document) -> Result<TenantRecord, StoreError> {
    let owner_id = match document.fields.get(OWNER_FIELD).map(decode_value) {
        Some(Value::String(owner)) => owner,
        _ => {
            return Err(StoreError::Decode(format!(
                "document '{}' has no string {} field",
                id, OWNER_FIELD
            )))
        }
    };

    let settings = match document.fields.get(SETTINGS_FIELD).map(decode_value) {
        None | Some(Value::Null) => None,
        Some(Value::String(blob)) => Some(blob),
        // Settings stored as a native map are re-serialized so the caller
        // always sees the blob form.
        Some(other) => Some(other.to_string()),
    };

    Ok(TenantRecord {
        id: id.to_string(),
        owner_id,
        settings,
    })
}

fn decode_user(uid: &str, lookup: LookupResponse) -> Result<UserRecord, StoreError> {
    let user = lookup
        .users
        .into_iter()
        .find(|u| u.local_id == uid)
        .ok_or_else(|| StoreError::NotFound { kind: "user", id: uid.to_string() })?;

    let claims = match user.custom_attributes.as_deref().map(str::trim) {
        None | Some("") => Map::new(),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(StoreError::Decode("custom attributes are not an object".into())),
            Err(e) => return Err(StoreError::Decode(format!("custom attributes: {}", e))),
        },
    };

    Ok(UserRecord {
        uid: user.local_id,
        claims,
    })
}

/// Convert a typed Firestore value (`{"stringValue": ...}` etc.) to plain JSON.
fn decode_value(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = object.get("stringValue") {
        return s.clone();
    }
    if let Some(b) = object.get("booleanValue") {
        return b.clone();
    }
    if let Some(i) = object.get("integerValue") {
        // Integers are transported as strings.
        return match i {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        };
    }
    if let Some(d) = object.get("doubleValue") {
        return d.clone();
    }
    if let Some(t) = object.get("timestampValue") {
        return t.clone();
    }
    if let Some(map) = object.get("mapValue") {
        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), decode_value(v)))
                    .collect::<Map<_, _>>()
            })
            .unwrap_or_default();
        return Value::Object(fields);
    }
    if let Some(array) = object.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }

    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(fields: Value) -> Document {
        serde_json::from_value(json!({ "name": "projects/p/databases/(default)/documents/restaurants/r1", "fields": fields }))
            .unwrap()
    }

    #[test]
    fn test_decode_tenant_with_string_settings() {
        let doc = document(json!({
            "ownerId": { "stringValue": "user-1" },
            "settings": { "stringValue": "{\"aiAnalyticsEnabled\":true}" }
        }));

        let tenant = decode_tenant("r1", doc).unwrap();
        assert_eq!(tenant.owner_id, "user-1");
        assert_eq!(tenant.settings.as_deref(), Some("{\"aiAnalyticsEnabled\":true}"));
    }

    #[test]
    fn test_decode_tenant_with_map_settings() {
        let doc = document(json!({
            "ownerId": { "stringValue": "user-1" },
            "settings": { "mapValue": { "fields": {
                "aiAnalyticsEnabled": { "booleanValue": true },
                "tables": { "integerValue": "12" }
            } } }
        }));

        let tenant = decode_tenant("r1", doc).unwrap();
        let settings: Value = serde_json::from_str(tenant.settings.as_deref().unwrap()).unwrap();
        assert_eq!(settings["aiAnalyticsEnabled"], true);
        assert_eq!(settings["tables"], 12);
    }

    #[test]
    fn test_decode_tenant_without_owner() {
        let doc = document(json!({ "settings": { "stringValue": "{}" } }));
        assert!(matches!(decode_tenant("r1", doc), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_decode_user_claims() {
        let lookup: LookupResponse = serde_json::from_value(json!({
            "users": [{ "localId": "user-1", "customAttributes": "{\"tier\":\"pro\"}" }]
        }))
        .unwrap();

        let user = decode_user("user-1", lookup).unwrap();
        assert_eq!(user.claim_str("tier"), Some("pro"));
    }

    #[test]
    fn test_decode_user_missing_is_not_found() {
        let lookup: LookupResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            decode_user("user-1", lookup),
            Err(StoreError::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn test_decode_array_value() {
        let value = decode_value(&json!({ "arrayValue": { "values": [
            { "stringValue": "a" }, { "booleanValue": false }
        ] } }));
        assert_eq!(value, json!(["a", false]));
    }
}
