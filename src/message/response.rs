//! RexPro response messages.
//!
//! Response messages are received from the server, one per request.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::driver::types::Value;

/// RexPro server error codes.
///
/// Error responses carry a flag identifying the failure category; the
/// driver maps session errors onto the retry path and everything else
/// onto script faults surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Malformed or unexpected message
    InvalidMessage,
    /// Session key unknown or expired
    InvalidSession,
    /// Script raised an error during execution
    ScriptFailure,
    /// Authentication rejected
    AuthFailure,
    /// Requested graph is not configured
    GraphConfig,
    /// Channel/serializer mismatch
    ChannelConfig,
    /// Result could not be serialized
    ResultSerialization,
}

impl ErrorCode {
    /// Protocol flag name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidMessage => "INVALID_MESSAGE_ERROR",
            ErrorCode::InvalidSession => "INVALID_SESSION_ERROR",
            ErrorCode::ScriptFailure => "SCRIPT_FAILURE_ERROR",
            ErrorCode::AuthFailure => "AUTH_FAILURE_ERROR",
            ErrorCode::GraphConfig => "GRAPH_CONFIG_ERROR",
            ErrorCode::ChannelConfig => "CHANNEL_CONFIG_ERROR",
            ErrorCode::ResultSerialization => "RESULT_SERIALIZATION_ERROR",
        }
    }

    /// Whether this code reports an expired or unknown session.
    pub fn is_session_error(&self) -> bool {
        matches!(self, ErrorCode::InvalidSession)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error response from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Failure category
    pub code: ErrorCode,
    /// Server error message
    pub message: String,
}

impl ErrorResponse {
    /// Create an error response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A response message received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// Session established
    SessionOpened {
        /// Key identifying the new session
        session_key: String,
    },
    /// Session close acknowledged
    Ack,
    /// Script results, decoded
    Results(Vec<Value>),
    /// Server reported an error
    Error(ErrorResponse),
}

impl Response {
    /// Short message name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Response::SessionOpened { .. } => "SessionOpened",
            Response::Ack => "Ack",
            Response::Results(_) => "Results",
            Response::Error(_) => "Error",
        }
    }

    /// Whether this is an error response.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_names() {
        assert_eq!(ErrorCode::InvalidSession.as_str(), "INVALID_SESSION_ERROR");
        assert_eq!(ErrorCode::ScriptFailure.as_str(), "SCRIPT_FAILURE_ERROR");
    }

    #[test]
    fn test_session_error_flag() {
        assert!(ErrorCode::InvalidSession.is_session_error());
        assert!(!ErrorCode::ScriptFailure.is_session_error());
        assert!(!ErrorCode::AuthFailure.is_session_error());
    }

    #[test]
    fn test_error_response_display() {
        let err = ErrorResponse::new(ErrorCode::ScriptFailure, "division by zero");
        assert_eq!(err.to_string(), "SCRIPT_FAILURE_ERROR: division by zero");
    }

    #[test]
    fn test_response_name() {
        let resp = Response::SessionOpened {
            session_key: "abc".to_string(),
        };
        assert_eq!(resp.name(), "SessionOpened");
        assert!(!resp.is_error());

        let resp = Response::Error(ErrorResponse::new(ErrorCode::InvalidMessage, "bad"));
        assert!(resp.is_error());
    }

    #[test]
    fn test_results_carry_values() {
        let resp = Response::Results(vec![Value::Int(3)]);
        if let Response::Results(values) = resp {
            assert_eq!(values, vec![Value::Int(3)]);
        } else {
            panic!("Expected Results");
        }
    }
}
