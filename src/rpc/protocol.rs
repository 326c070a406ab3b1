//! JSON-RPC 2.0 wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error code for a request that could not be parsed as JSON.
pub const PARSE_ERROR: i64 = -32_700;
/// Error code for an unrecognised method name.
pub const METHOD_NOT_FOUND: i64 = -32_601;
/// Error code for invalid or missing parameters.
pub const INVALID_PARAMS: i64 = -32_602;
/// Error code for a handler failure while executing a recognised method.
pub const INTERNAL_ERROR: i64 = -32_603;

/// A single JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker; always `"2.0"`.
    #[serde(default)]
    pub jsonrpc: String,
    /// Caller-supplied correlation id, echoed back verbatim.
    #[serde(default)]
    pub id: Value,
    /// The method to invoke.
    pub method: String,
    /// Method parameters, if any.
    #[serde(default)]
    pub params: Value,
}

/// A single JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Protocol marker; always `"2.0"`.
    pub jsonrpc: &'static str,
    /// The id copied from the originating request.
    pub id: Value,
    /// The successful result, when no error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error, when the request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a successful response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0", id, result: None, error: Some(error) }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Numeric error code, one of the constants declared in this module.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

impl JsonRpcError {
    /// Builds an error with the given code and message.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}
