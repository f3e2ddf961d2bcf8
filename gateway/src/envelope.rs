//! Wire types shared by the server, the dispatcher and the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::Params;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A validated `{module, params}` call.
pub struct McpRequest {
    pub module: String,
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Uniform response envelope.
///
/// Both `result` and `error` are always serialized; the unused one is `null`.
pub struct McpResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl McpResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_null_error() {
        let v = serde_json::to_value(McpResponse::ok(serde_json::json!(8))).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "success": true, "result": 8, "error": null })
        );
    }

    #[test]
    fn failure_survives_json_round_trip() {
        let resp = McpResponse::fail("Module not found");
        let bytes = serde_json::to_vec(&resp).unwrap();
        let back: McpResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, resp);
        assert!(!back.success);
    }

    #[test]
    fn missing_optional_fields_decode_as_none() {
        let back: McpResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!back.success);
        assert!(back.result.is_none());
        assert!(back.error.is_none());
    }
}
