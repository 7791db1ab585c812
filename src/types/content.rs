//! Content parts - the closed set of payloads a conversation turn can carry.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Where image bytes come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageSourceType {
    Base64,
    Url,
}

/// Function invocation carried by a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as a JSON document (always a valid JSON object once sanitized)
    pub arguments: String,
}

/// A model-issued request to invoke a named function.
///
/// The `thought_signature` is an opaque vendor continuation token. It must be
/// resent verbatim with the tool call on every later turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    /// Call id, referenced by the matching `ToolCallResponse`
    pub id: String,
    /// Call type, always `"function"`
    #[serde(rename = "type", default = "default_tool_call_type")]
    pub r#type: String,
    /// Function name and arguments
    #[serde(rename = "function")]
    pub function_call: FunctionCall,
    /// Opaque continuation token issued alongside the call
    #[serde(
        rename = "thoughtSignature",
        alias = "thought_signature",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thought_signature: Option<String>,
}

fn default_tool_call_type() -> String {
    "function".to_string()
}

impl ToolCall {
    /// Create a function tool call.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            r#type: default_tool_call_type(),
            function_call: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
            thought_signature: None,
        }
    }

    /// Attach a vendor continuation token.
    pub fn with_thought_signature(mut self, signature: impl Into<String>) -> Self {
        self.thought_signature = Some(signature.into());
        self
    }

    /// Function name shortcut.
    pub fn name(&self) -> &str {
        &self.function_call.name
    }

    /// Raw arguments shortcut.
    pub fn arguments(&self) -> &str {
        &self.function_call.arguments
    }

    /// Parse the arguments as JSON.
    pub fn parsed_arguments(&self) -> Result<serde_json::Value, LlmError> {
        serde_json::from_str(&self.function_call.arguments).map_err(|e| {
            LlmError::MalformedToolArguments {
                tool: self.function_call.name.clone(),
                message: e.to_string(),
            }
        })
    }
}

/// Content part - provider-agnostic conversation payload
///
/// This is a closed set. Adapters translating parts into a vendor format must
/// return [`LlmError::UnsupportedContentPart`] for any part they cannot
/// express instead of dropping it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },

    /// Image given inline (base64) or by URL
    Image {
        #[serde(rename = "sourceType", alias = "source_type")]
        source_type: ImageSourceType,
        #[serde(rename = "mediaType", alias = "media_type")]
        media_type: String,
        data: String,
    },

    /// Tool call issued by the model
    ToolCall {
        #[serde(rename = "toolCall", alias = "tool_call")]
        tool_call: ToolCall,
    },

    /// Result of executing a tool call
    ToolCallResponse {
        #[serde(rename = "toolCallId", alias = "tool_call_id")]
        tool_call_id: String,
        name: String,
        content: String,
    },
}

/// Tag names of every supported content part.
pub const CONTENT_PART_KINDS: [&str; 4] = ["text", "image", "tool_call", "tool_call_response"];

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part from a URL.
    ///
    /// The media type is guessed from the URL path and falls back to
    /// `image/png`.
    pub fn image_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let media_type = mime_guess::from_path(path)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "image/png".to_string());
        Self::Image {
            source_type: ImageSourceType::Url,
            media_type,
            data: url,
        }
    }

    /// Create an image part from base64 data
    pub fn image_base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            source_type: ImageSourceType::Base64,
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Wrap a tool call
    pub fn tool_call(call: ToolCall) -> Self {
        Self::ToolCall { tool_call: call }
    }

    /// Create a tool call response part
    pub fn tool_response(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolCallResponse {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Tag name of this part.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolCallResponse { .. } => "tool_call_response",
        }
    }

    /// Text of a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Tool call of a tool call part
    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            Self::ToolCall { tool_call } => Some(tool_call),
            _ => None,
        }
    }

    /// Parse a part from untrusted JSON.
    ///
    /// An unknown or missing `type` tag is reported as
    /// [`LlmError::UnsupportedContentPart`] naming the tag; a known tag with
    /// bad fields is a [`LlmError::JsonError`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, LlmError> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("<missing>")
            .to_string();
        if !CONTENT_PART_KINDS.contains(&kind.as_str()) {
            return Err(LlmError::unsupported_part(
                kind,
                format!("expected one of {}", CONTENT_PART_KINDS.join(", ")),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

impl From<ToolCall> for ContentPart {
    fn from(call: ToolCall) -> Self {
        Self::ToolCall { tool_call: call }
    }
}
