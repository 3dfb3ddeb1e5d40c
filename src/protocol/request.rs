//! Request and Response message types.
//!
//! Defines the JSON-RPC 2.0 envelope exchanged with the node.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::Method;

/// Protocol version tag carried by every request.
const JSONRPC_VERSION: &str = "2.0";

// ============================================================================
// Request
// ============================================================================

/// A method call from local end to the node.
///
/// # Format
///
/// ```json
/// {
///   "jsonrpc": "2.0",
///   "id": 1,
///   "method": "namespace_methodName",
///   "params": []
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: &'static str,

    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Method name.
    #[serde(flatten)]
    pub method: Method,

    /// Positional parameters; none of the modeled methods take any.
    pub params: Vec<Value>,
}

impl Request {
    /// Creates a new request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<Method>) -> Self {
        Self::with_id(RequestId::generate(), method)
    }

    /// Creates a new request with specific ID.
    #[inline]
    #[must_use]
    pub fn with_id(id: RequestId, method: impl Into<Method>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params: Vec::new(),
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the node.
///
/// # Format
///
/// Success:
/// ```json
/// { "jsonrpc": "2.0", "id": 1, "result": 8080 }
/// ```
///
/// Error:
/// ```json
/// { "jsonrpc": "2.0", "id": 1, "error": { "code": -32000, "message": "..." } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`. Absent on notifications.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error object (if error).
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcErrorObject {
    /// Error code.
    pub code: i64,

    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// A missing or `null` result is returned as [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`] if the node answered with an error object.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(Error::rpc(error.code, error.message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ParityMethod, SignerMethod};

    #[test]
    fn test_request_serialization() {
        let request = Request::with_id(RequestId::new(3), ParityMethod::DappsPort);
        let json = serde_json::to_value(&request).expect("serialize");

        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 3);
        assert_eq!(json["method"], "parity_dappsPort");
        assert_eq!(json["params"], serde_json::json!([]));
        assert_eq!(json.as_object().map(|o| o.len()), Some(4));
    }

    #[test]
    fn test_request_new_allocates_ids() {
        let first = Request::new(SignerMethod::GenerateAuthorizationToken);
        let second = Request::new(SignerMethod::GenerateAuthorizationToken);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_success_response() {
        let json_str = r#"{"jsonrpc": "2.0", "id": 1, "result": 8080}"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(!response.is_error());
        assert_eq!(response.id, Some(RequestId::new(1)));
        assert_eq!(response.into_result().expect("success"), Value::from(8080));
    }

    #[test]
    fn test_null_result_is_success() {
        let json_str = r#"{"jsonrpc": "2.0", "id": 1, "result": null}"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert_eq!(response.into_result().expect("success"), Value::Null);
    }

    #[test]
    fn test_error_response() {
        let json_str = r#"{
            "jsonrpc": "2.0",
            "id": 9,
            "error": {"code": -32000, "message": "Signer is disabled"}
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_error());

        match response.into_result() {
            Err(Error::Rpc { code, message }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "Signer is disabled");
            }
            other => panic!("expected RPC error, got {other:?}"),
        }
    }

    #[test]
    fn test_notification_has_no_id() {
        let json_str = r#"{"jsonrpc": "2.0", "method": "parity_subscription", "params": {}}"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.id.is_none());
    }
}
