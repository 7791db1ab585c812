//! Core error types.

use thiserror::Error;

/// Coarse error classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing credentials, invalid model id, invalid option values.
    Configuration,
    /// Invalid tool arguments, unknown content parts, inconsistent history.
    MalformedData,
    /// Streamed output that disagrees with the final response (adapter bug).
    StreamingConsistency,
    /// Caller-initiated cancellation or deadline expiry.
    Cancellation,
    /// A replayed request had no recorded fixture.
    ReplayMiss,
    /// Failures reported by the vendor.
    Vendor,
    /// Local I/O and internal failures.
    Internal,
}

/// Unified error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Credentials were not supplied.
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// An option value is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Input rejected before reaching the vendor.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An embedding request carried no text.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A content part outside the closed variant set, or one the adapter
    /// cannot express.
    #[error("Unsupported content part `{kind}`: {context}")]
    UnsupportedContentPart { kind: String, context: String },

    /// Tool arguments that are not a JSON object.
    #[error("Malformed arguments for tool `{tool}`: {message}")]
    MalformedToolArguments { tool: String, message: String },

    /// Required schema properties absent from a tool call.
    #[error("Tool `{tool}` call is missing required arguments: {}", missing.join(", "))]
    MissingRequiredArguments { tool: String, missing: Vec<String> },

    /// A conversation that violates the tool round-trip rules.
    #[error("Invalid conversation history: {0}")]
    InvalidHistory(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Vendor payload that could not be interpreted.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Streamed output inconsistent with the final response.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// The request was cancelled by the caller.
    #[error("Request cancelled")]
    Cancelled,

    /// The caller-supplied deadline elapsed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// No fixture recorded for a replayed request.
    #[error(
        "No recorded fixture for test `{test_name}` ({provider}/{model_id}, hash {request_hash})"
    )]
    ReplayMiss {
        test_name: String,
        provider: String,
        model_id: String,
        request_hash: String,
    },

    /// A fixture file exists but cannot be used.
    #[error("Fixture error: {0}")]
    FixtureError(String),

    /// Local I/O failure.
    #[error("IO error: {0}")]
    IoError(String),

    /// HTTP-level vendor error.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Vendor-specific error envelope.
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: String,
        message: String,
        error_code: Option<String>,
    },

    /// Internal invariant failure.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LlmError {
    /// Create an API error without details.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create an unsupported content part error.
    pub fn unsupported_part(kind: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnsupportedContentPart {
            kind: kind.into(),
            context: context.into(),
        }
    }

    /// HTTP status code, when the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Coarse category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError(_)
            | Self::MissingApiKey(_)
            | Self::InvalidParameter(_) => ErrorCategory::Configuration,
            Self::InvalidInput(_)
            | Self::EmptyInput(_)
            | Self::UnsupportedContentPart { .. }
            | Self::MalformedToolArguments { .. }
            | Self::MissingRequiredArguments { .. }
            | Self::InvalidHistory(_)
            | Self::JsonError(_)
            | Self::ParseError(_) => ErrorCategory::MalformedData,
            Self::StreamError(_) => ErrorCategory::StreamingConsistency,
            Self::Cancelled | Self::Timeout(_) => ErrorCategory::Cancellation,
            Self::ReplayMiss { .. } => ErrorCategory::ReplayMiss,
            Self::ApiError { .. } | Self::ProviderError { .. } => ErrorCategory::Vendor,
            Self::FixtureError(_) | Self::IoError(_) | Self::InternalError(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Whether a caller may reasonably retry the request.
    ///
    /// Only transient vendor failures qualify. Retrying itself is left to the
    /// caller or the vendor SDK.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { code, .. } => *code == 429 || (500..600).contains(code),
            Self::ProviderError { error_code, .. } => matches!(
                error_code.as_deref(),
                Some("overloaded_error" | "rate_limit_error" | "api_error")
            ),
            _ => false,
        }
    }

    /// Whether this error stems from cancellation or a deadline.
    pub fn is_cancellation(&self) -> bool {
        self.category() == ErrorCategory::Cancellation
    }
}
