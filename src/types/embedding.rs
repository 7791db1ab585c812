//! Embedding request/response types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::usage::Usage;
use crate::error::LlmError;

/// Embedding input: one string or a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    /// Flatten into a list of texts
    pub fn into_texts(self) -> Vec<String> {
        match self {
            Self::Single(text) => vec![text],
            Self::Batch(texts) => texts,
        }
    }

    /// Number of texts
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(texts) => texts.len(),
        }
    }

    /// Whether there is nothing to embed
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(text) => text.is_empty(),
            Self::Batch(texts) => texts.iter().all(String::is_empty),
        }
    }
}

impl From<&str> for EmbeddingInput {
    fn from(text: &str) -> Self {
        Self::Single(text.to_string())
    }
}

impl From<String> for EmbeddingInput {
    fn from(text: String) -> Self {
        Self::Single(text)
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(texts: Vec<String>) -> Self {
        Self::Batch(texts)
    }
}

/// Embedding call options
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingOptions {
    /// Model id override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Requested vector dimensions, for models that support truncation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// Opaque metadata forwarded to the adapter
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Embedding response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingResponse {
    /// One vector per input text, in input order
    pub embeddings: Vec<Vec<f32>>,
    /// Model that produced the vectors
    pub model: String,
    /// Token usage, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Reject input with nothing to embed
pub fn validate_embedding_input(input: &EmbeddingInput) -> Result<(), LlmError> {
    if input.is_empty() {
        return Err(LlmError::EmptyInput(
            "embedding input must contain at least one non-empty string".to_string(),
        ));
    }
    Ok(())
}
