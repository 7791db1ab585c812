//! Error Handling Module
//!
//! This module provides the error type shared by every layer of the crate:
//! - Core error type (`LlmError`) and its coarse `ErrorCategory`
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use unillm::error::{ErrorCategory, LlmError};
//!
//! let error = LlmError::api_error(503, "overloaded");
//! assert_eq!(error.category(), ErrorCategory::Vendor);
//! assert!(error.is_retryable());
//! ```

mod conversions;
pub mod types;

pub use types::*;
