//! Generation responses

use serde::{Deserialize, Serialize};

use super::content::ToolCall;
use super::usage::{GenerationInfo, Usage};

/// One candidate completion
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentChoice {
    /// Final text content
    #[serde(default)]
    pub content: String,
    /// Vendor stop reason, passed through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    /// Reasoning/thinking text, when the vendor exposes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Complete tool calls, in the order their first fragment arrived.
    /// Streamed tool-call chunks follow completion order instead.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Raw generation metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_info: Option<GenerationInfo>,
}

impl ContentChoice {
    /// Normalized usage of this choice
    pub fn usage(&self) -> Option<Usage> {
        self.generation_info.as_ref().and_then(GenerationInfo::usage)
    }
}

/// Final response of a generation call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentResponse {
    pub choices: Vec<ContentChoice>,
}

impl ContentResponse {
    /// Response with a single choice
    pub fn single(choice: ContentChoice) -> Self {
        Self {
            choices: vec![choice],
        }
    }

    /// First choice
    pub fn first(&self) -> Option<&ContentChoice> {
        self.choices.first()
    }

    /// Content of the first choice, empty when there is none
    pub fn content(&self) -> &str {
        self.first().map(|c| c.content.as_str()).unwrap_or_default()
    }

    /// Tool calls of the first choice
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.first().map(|c| c.tool_calls.as_slice()).unwrap_or_default()
    }

    /// Usage of the first choice
    pub fn usage(&self) -> Option<Usage> {
        self.first().and_then(ContentChoice::usage)
    }
}
