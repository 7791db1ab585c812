//! Type Conversions for LlmError
//!
//! From trait implementations for converting common error types into LlmError.

use super::types::LlmError;

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<std::io::Error> for LlmError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for LlmError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::InternalError(format!("worker task failed: {err}"))
        }
    }
}
