//! Error types for mlbridge.
//!
//! Every remote call either fully succeeds with a well-typed value or fails with
//! one of these variants. Nothing here is retried or recovered locally; callers
//! receive the error as soon as the bridge reports it.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the proxy runtime.
#[derive(Debug, Error)]
pub enum BridgeError {
    // Remote-side failures
    #[error("Failed to construct remote {class_name}: {message}")]
    RemoteConstruction { class_name: String, message: String },

    #[error("Remote call {method} threw {exception_class}: {message}")]
    RemoteInvocation {
        method: String,
        /// Class of the exception raised inside the remote runtime
        exception_class: String,
        message: String,
    },

    #[error("Bridge protocol error: {message}")]
    RemoteProtocol { message: String },

    // Local unmarshaling failures
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("No local wrapper registered for remote type {class_name}")]
    UnknownRemoteType { class_name: String },

    // File system errors (reference runtime persistence)
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BridgeError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for a protocol failure.
    pub fn protocol(message: impl Into<String>) -> Self {
        BridgeError::RemoteProtocol {
            message: message.into(),
        }
    }

    /// Shorthand for a type mismatch.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        BridgeError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard JSON-RPC error codes:
    /// - -32700: Parse error
    /// - -32600: Invalid Request
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Bridge error codes:
    /// - -32010: Remote construction failed
    /// - -32011: Remote invocation threw
    /// - -32012: Type mismatch
    /// - -32013: Unknown remote type
    /// - -32014: Validation error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            BridgeError::RemoteConstruction { .. } => -32010,
            BridgeError::RemoteInvocation { .. } => -32011,
            BridgeError::TypeMismatch { .. } => -32012,
            BridgeError::UnknownRemoteType { .. } => -32013,
            BridgeError::Validation { .. } => -32014,
            _ => -32603,
        }
    }

    /// Structured payload carried in the JSON-RPC error `data` field.
    ///
    /// Lets the receiving side rebuild the same variant instead of a flat message.
    pub fn to_rpc_error_data(&self) -> Option<serde_json::Value> {
        match self {
            BridgeError::RemoteConstruction {
                class_name,
                message,
            } => Some(serde_json::json!({
                "class_name": class_name,
                "message": message,
            })),
            BridgeError::RemoteInvocation {
                method,
                exception_class,
                message,
            } => Some(serde_json::json!({
                "method": method,
                "exception_class": exception_class,
                "message": message,
            })),
            BridgeError::TypeMismatch { expected, actual } => Some(serde_json::json!({
                "expected": expected,
                "actual": actual,
            })),
            BridgeError::UnknownRemoteType { class_name } => {
                Some(serde_json::json!({ "class_name": class_name }))
            }
            BridgeError::Validation { field, message } => Some(serde_json::json!({
                "field": field,
                "message": message,
            })),
            _ => None,
        }
    }

    /// Rebuild a typed error from a JSON-RPC error object.
    ///
    /// Codes outside the bridge range become `RemoteProtocol`, since they mean the
    /// peer could not even process the request.
    pub fn from_rpc_error(code: i32, message: &str, data: Option<&serde_json::Value>) -> Self {
        let field = |name: &str| -> String {
            data.and_then(|d| d.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_default()
        };

        match code {
            -32010 => BridgeError::RemoteConstruction {
                class_name: field("class_name"),
                message: data
                    .and_then(|d| d.get("message"))
                    .and_then(|v| v.as_str())
                    .unwrap_or(message)
                    .to_string(),
            },
            -32011 => BridgeError::RemoteInvocation {
                method: field("method"),
                exception_class: field("exception_class"),
                message: data
                    .and_then(|d| d.get("message"))
                    .and_then(|v| v.as_str())
                    .unwrap_or(message)
                    .to_string(),
            },
            -32012 => BridgeError::TypeMismatch {
                expected: field("expected"),
                actual: field("actual"),
            },
            -32013 => BridgeError::UnknownRemoteType {
                class_name: field("class_name"),
            },
            -32014 => BridgeError::Validation {
                field: field("field"),
                message: message.to_string(),
            },
            _ => BridgeError::RemoteProtocol {
                message: format!("{} (code {})", message, code),
            },
        }
    }
}
