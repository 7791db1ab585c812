//! Chat message types

use serde::{Deserialize, Serialize};

use super::content::{ContentPart, ToolCall};

/// Message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Human,
    Ai,
    Tool,
    Generic,
    Function,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::System => "system",
            Self::Human => "human",
            Self::Ai => "ai",
            Self::Tool => "tool",
            Self::Generic => "generic",
            Self::Function => "function",
        };
        f.write_str(name)
    }
}

/// Chat message
///
/// One conversation turn. The order of `parts` is significant: text emitted
/// before a tool call in the same turn stays before it.
///
/// # Examples
///
/// ```rust,ignore
/// use unillm::types::{ChatMessage, ContentPart, ToolCall};
///
/// let question = ChatMessage::human("What's in go.mod?");
///
/// let reply = ChatMessage::ai_with_parts(vec![
///     ContentPart::text("Let me look."),
///     ContentPart::tool_call(ToolCall::new("call_1", "read_file", r#"{"path":"go.mod"}"#)),
/// ]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role
    pub role: MessageRole,
    /// Ordered payload
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    /// Create a message with the given role and parts
    pub fn new(role: MessageRole, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, vec![ContentPart::text(text)])
    }

    /// Create a human message
    pub fn human(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, vec![ContentPart::text(text)])
    }

    /// Create an AI message with text only
    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Ai, vec![ContentPart::text(text)])
    }

    /// Create an AI message from arbitrary parts
    pub fn ai_with_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(MessageRole::Ai, parts)
    }

    /// Create a tool message from response parts
    pub fn tool(parts: Vec<ContentPart>) -> Self {
        Self::new(MessageRole::Tool, parts)
    }

    /// Append a text part
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ContentPart::text(text));
        self
    }

    /// Append an image part referenced by URL
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.parts.push(ContentPart::image_url(url));
        self
    }

    /// Append an inline base64 image part
    pub fn with_image_base64(
        mut self,
        media_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        self.parts.push(ContentPart::image_base64(media_type, data));
        self
    }

    /// Append a tool call part
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.parts.push(ContentPart::tool_call(call));
        self
    }

    /// Append a tool call response part
    pub fn with_tool_response(
        mut self,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.parts
            .push(ContentPart::tool_response(tool_call_id, name, content));
        self
    }

    /// Concatenation of every text part, in order
    pub fn text_content(&self) -> String {
        self.parts.iter().filter_map(ContentPart::as_text).collect()
    }

    /// Tool calls carried by this message, in order
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(ContentPart::as_tool_call)
    }

    /// `(tool_call_id, name)` of every tool call response carried by this message
    pub fn tool_responses(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts.iter().filter_map(|p| match p {
            ContentPart::ToolCallResponse {
                tool_call_id, name, ..
            } => Some((tool_call_id.as_str(), name.as_str())),
            _ => None,
        })
    }

    /// Whether this message carries at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().next().is_some()
    }
}
