use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MssqlConnectionError;

/// Code for arguments that are missing or of the wrong JSON type.
pub const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";

/// A request from the host: a method name plus a JSON object of named arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Opaque correlation id, echoed back unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    #[must_use]
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            method: method.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Value) -> Self {
        self.id = Some(id);
        self
    }
}

/// Reply to a [`MethodCall`].
///
/// ```rust
/// use mssql_connection::bridge::MethodResponse;
///
/// let json = serde_json::to_string(&MethodResponse::NotImplemented).unwrap();
/// assert_eq!(json, r#"{"status":"notImplemented"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    #[must_use]
    pub fn success(result: impl Into<Value>) -> Self {
        MethodResponse::Success {
            result: result.into(),
        }
    }

    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, MethodResponse::Success { .. })
    }
}

impl From<Result<Value, MethodError>> for MethodResponse {
    fn from(outcome: Result<Value, MethodError>) -> Self {
        match outcome {
            Ok(result) => MethodResponse::Success { result },
            Err(err) => MethodResponse::Error {
                code: err.code.to_string(),
                message: err.message,
            },
        }
    }
}

/// A response tagged with the id of the call it answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub response: MethodResponse,
}

/// Failure of a single handler, already mapped to a response code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodError {
    pub code: &'static str,
    pub message: String,
}

impl MethodError {
    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_ARGUMENTS,
            message: message.into(),
        }
    }
}

impl From<MssqlConnectionError> for MethodError {
    fn from(err: MssqlConnectionError) -> Self {
        Self {
            code: err.kind().code(),
            message: err.to_string(),
        }
    }
}
