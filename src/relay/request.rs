//! Inbound relay request body.

use serde::Deserialize;
use serde_json::Value;

use crate::error::RelayError;
use crate::prompt::AnalyticsData;
use crate::upstream::ChatMessage;

/// Longest tenant reference accepted.
const MAX_TENANT_REF_LEN: usize = 128;

/// Raw request body, before field presence checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default, alias = "restaurantId")]
    pub tenant_ref: Option<String>,

    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,

    #[serde(default)]
    pub analytics_data: Option<AnalyticsData>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default, rename = "max_tokens", alias = "maxTokens")]
    pub max_tokens: Option<u32>,
}

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayVariant {
    /// Caller-supplied conversation.
    Chat(Vec<ChatMessage>),
    /// Structured analytics to be turned into a prompt server-side.
    Analytics(AnalyticsData),
}

impl RelayVariant {
    /// Label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            RelayVariant::Chat(_) => "chat",
            RelayVariant::Analytics(_) => "analytics",
        }
    }
}

/// A request that passed parsing and field presence checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub tenant_ref: String,
    pub variant: RelayVariant,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

/// Parse the body into a JSON object.
pub fn parse_body(bytes: &[u8]) -> Result<Value, RelayError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| RelayError::InvalidBody(e.to_string()))?;
    if !value.is_object() {
        return Err(RelayError::InvalidBody("expected a JSON object".into()));
    }
    Ok(value)
}

/// Check required fields and pick the request variant.
pub fn validate_fields(body: Value) -> Result<ValidatedRequest, RelayError> {
    let request: RelayRequest =
        serde_json::from_value(body).map_err(|e| RelayError::InvalidBody(e.to_string()))?;

    let tenant_ref = request
        .tenant_ref
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(RelayError::MissingField("tenantRef"))?
        .to_string();

    if tenant_ref.len() > MAX_TENANT_REF_LEN
        || !tenant_ref
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RelayError::InvalidField {
            field: "tenantRef",
            reason: "must be an identifier of letters, digits, '-' or '_'".into(),
        });
    }

    let variant = match (request.messages, request.analytics_data) {
        (Some(_), Some(_)) => {
            return Err(RelayError::InvalidField {
                field: "messages",
                reason: "cannot be combined with analyticsData".into(),
            })
        }
        (Some(messages), None) if messages.is_empty() => {
            return Err(RelayError::InvalidField {
                field: "messages",
                reason: "must not be empty".into(),
            })
        }
        (Some(messages), None) => RelayVariant::Chat(messages),
        (None, Some(data)) => RelayVariant::Analytics(data),
        (None, None) => return Err(RelayError::MissingField("messages or analyticsData")),
    };

    if request.max_tokens == Some(0) {
        return Err(RelayError::InvalidField {
            field: "max_tokens",
            reason: "must be greater than 0".into(),
        });
    }

    Ok(ValidatedRequest {
        tenant_ref,
        variant,
        model: request.model.filter(|m| !m.trim().is_empty()),
        max_tokens: request.max_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request() {
        let request = validate_fields(json!({
            "tenantRef": "r1",
            "messages": [{ "role": "user", "content": "Hello" }],
            "model": "claude-x",
            "max_tokens": 300
        }))
        .unwrap();

        assert_eq!(request.tenant_ref, "r1");
        assert_eq!(request.variant.name(), "chat");
        assert_eq!(request.model.as_deref(), Some("claude-x"));
        assert_eq!(request.max_tokens, Some(300));
    }

    #[test]
    fn test_restaurant_id_alias() {
        let request = validate_fields(json!({
            "restaurantId": "r1",
            "analyticsData": {}
        }))
        .unwrap();
        assert_eq!(request.tenant_ref, "r1");
        assert_eq!(request.variant.name(), "analytics");
    }

    #[test]
    fn test_missing_tenant_ref() {
        let err = validate_fields(json!({ "messages": [{ "role": "user", "content": "x" }] }))
            .unwrap_err();
        assert!(matches!(err, RelayError::MissingField("tenantRef")));
    }

    #[test]
    fn test_missing_payload() {
        let err = validate_fields(json!({ "tenantRef": "r1" })).unwrap_err();
        assert!(matches!(err, RelayError::MissingField("messages or analyticsData")));
    }

    #[test]
    fn test_empty_messages() {
        let err = validate_fields(json!({ "tenantRef": "r1", "messages": [] })).unwrap_err();
        assert!(matches!(err, RelayError::InvalidField { field: "messages", .. }));
    }

    #[test]
    fn test_tenant_ref_must_be_identifier() {
        let err = validate_fields(json!({ "tenantRef": "../users/u1", "analyticsData": {} }))
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidField { field: "tenantRef", .. }));
    }

    #[test]
    fn test_wrong_types_are_invalid_body() {
        let err = validate_fields(json!({ "tenantRef": "r1", "messages": "hello" })).unwrap_err();
        assert!(matches!(err, RelayError::InvalidBody(_)));
    }

    #[test]
    fn test_parse_body_requires_object() {
        assert!(parse_body(b"{\"tenantRef\":\"r1\"}").is_ok());
        assert!(matches!(parse_body(b"[1,2]"), Err(RelayError::InvalidBody(_))));
        assert!(matches!(parse_body(b"{not json"), Err(RelayError::InvalidBody(_))));
    }
}
