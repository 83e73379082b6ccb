//! Response bodies produced by the relay itself.
//!
//! Upstream responses are relayed untouched; everything the relay answers on
//! its own uses [`ErrorBody`] so callers always see
//! `{ "error": ..., "message"?: ..., "details"?: ... }`.

use serde::Serialize;
use serde_json::Value;

/// JSON error body returned to callers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            details: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_omitted() {
        let body = serde_json::to_value(ErrorBody::new("Restaurant not found")).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Restaurant not found" }));
    }

    #[test]
    fn test_details_serialized() {
        let body = ErrorBody::new("Internal server error")
            .with_details(serde_json::json!({ "panic": true }));
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["details"]["panic"], true);
    }
}
