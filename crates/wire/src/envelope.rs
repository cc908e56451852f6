//! Request/Response envelope encoding for the docparity wire protocol
//!
//! Defines the wire format for command requests and responses:
//! - Request: `{id, op, db, params}`
//! - Success response: `{id, ok: true, result}`
//! - Error response: `{id, ok: false, error: {code, message}}`
//!
//! `params` is the command document itself: its `op` key names the target
//! collection, e.g. `{"find": "users", "filter": {...}}`.

use docparity_core::Document;
use docparity_engine::StoreError;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};

/// Wire protocol request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Request ID (echoed in response)
    pub id: String,
    /// Command name (e.g., "find", "insert")
    pub op: String,
    /// Database name
    #[serde(default)]
    pub db: String,
    /// Command document
    #[serde(default)]
    pub params: Document,
}

impl Request {
    pub fn new(id: impl Into<String>, op: impl Into<String>, db: impl Into<String>, params: Document) -> Self {
        Request {
            id: id.into(),
            op: op.into(),
            db: db.into(),
            params,
        }
    }
}

/// Wire protocol response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Request ID (from request)
    pub id: String,
    /// Success or failure
    pub ok: bool,
    /// Result (if ok=true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Document>,
    /// Error (if ok=false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// Error body of a failed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Numeric error code (11000 for duplicate keys, 59 for unknown commands)
    pub code: i32,
    /// Human-readable message
    pub message: String,
}

/// Code for commands the server does not know
pub const COMMAND_NOT_FOUND: i32 = 59;
/// Code for malformed command arguments
pub const BAD_VALUE: i32 = 2;
/// Code for arguments of the wrong type
pub const TYPE_MISMATCH: i32 = 14;

impl ApiError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }
}

impl From<&StoreError> for ApiError {
    fn from(e: &StoreError) -> Self {
        ApiError::new(e.code(), e.to_string())
    }
}

impl Response {
    /// Create a success response
    pub fn success(id: &str, result: Document) -> Self {
        Response {
            id: id.to_string(),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: &str, error: ApiError) -> Self {
        Response {
            id: id.to_string(),
            ok: false,
            result: None,
            error: Some(error),
        }
    }

    /// Unwrap into the result document or a command error
    pub fn into_result(self) -> Result<Document> {
        if self.ok {
            return Ok(self.result.unwrap_or_default());
        }
        match self.error {
            Some(e) => Err(WireError::Command {
                code: e.code,
                message: e.message,
            }),
            None => Err(WireError::protocol("error response without error body")),
        }
    }
}

/// Encode a request to JSON bytes
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    serde_json::to_vec(request).map_err(|e| WireError::protocol(format!("encode request: {}", e)))
}

/// Encode a response to JSON bytes
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    serde_json::to_vec(response).map_err(|e| WireError::protocol(format!("encode response: {}", e)))
}

/// Decode a request from JSON bytes
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    serde_json::from_slice(bytes).map_err(|e| WireError::protocol(format!("decode request: {}", e)))
}

/// Decode a response from JSON bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    serde_json::from_slice(bytes).map_err(|e| WireError::protocol(format!("decode response: {}", e)))
}
