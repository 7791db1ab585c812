//! Call configuration
//!
//! `CallOptions` is assembled once per call, either through the builder
//! methods or by applying composable [`CallOption`] functions. Adapters only
//! ever read it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::tools::{Tool, ToolChoice};
use crate::error::LlmError;
use crate::streaming::StreamSink;

/// Reasoning effort hint for reasoning models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

/// Output verbosity hint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    Medium,
    High,
}

/// Thinking level hint (Gemini-style)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    Low,
    High,
}

/// Structured output contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonSchemaFormat {
    /// Schema name, required by some vendors
    pub name: String,
    /// JSON schema the output must satisfy
    pub schema: serde_json::Value,
    /// Ask the vendor to enforce the schema strictly
    #[serde(default)]
    pub strict: bool,
}

/// Options for a single generation call
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Model id override; adapters fall back to their configured model
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Nucleus sampling
    pub top_p: Option<f32>,
    /// Maximum output tokens
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop_words: Vec<String>,
    /// Random seed
    pub seed: Option<u64>,
    /// Ask for a JSON object response
    pub json_mode: bool,
    /// Ask for output matching a JSON schema
    pub json_schema: Option<JsonSchemaFormat>,
    /// Tools the model may call
    pub tools: Vec<Tool>,
    /// Tool choice policy
    pub tool_choice: Option<ToolChoice>,
    /// Streaming sink; chunks are pushed here as they arrive
    pub stream: Option<StreamSink>,
    /// Reasoning effort
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Verbosity
    pub verbosity: Option<Verbosity>,
    /// Thinking level
    pub thinking_level: Option<ThinkingLevel>,
    /// Thinking token budget (Anthropic-style extended thinking)
    pub thinking_budget_tokens: Option<u32>,
    /// Opaque metadata forwarded to the adapter
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A composable option function
pub type CallOption = Arc<dyn Fn(&mut CallOptions) + Send + Sync>;

impl CallOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options by applying option functions in order
    pub fn from_options(options: &[CallOption]) -> Self {
        let mut opts = Self::default();
        opts.apply(options);
        opts
    }

    /// Apply option functions in order
    pub fn apply(&mut self, options: &[CallOption]) {
        for option in options {
            option(self);
        }
    }

    /// Set the model id
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the tools
    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the tool choice policy
    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Attach a streaming sink
    pub fn stream(mut self, sink: StreamSink) -> Self {
        self.stream = Some(sink);
        self
    }

    /// Whether a streaming sink is attached
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Look up a tool by name
    pub fn find_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Validate option values before any vendor call
    pub fn validate(&self) -> Result<(), LlmError> {
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(LlmError::ConfigurationError(
                    "Model id cannot be empty".to_string(),
                ));
            }
        }

        if let Some(temp) = self.temperature {
            if temp < 0.0 {
                return Err(LlmError::InvalidParameter(
                    "Temperature must be non-negative".to_string(),
                ));
            }
        }

        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(LlmError::InvalidParameter(
                    "top_p must be between 0.0 and 1.0".to_string(),
                ));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(LlmError::InvalidParameter(
                "max_tokens must be greater than zero".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for tool in &self.tools {
            if tool.name().is_empty() {
                return Err(LlmError::InvalidParameter(
                    "Tool name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(tool.name()) {
                return Err(LlmError::InvalidParameter(format!(
                    "Duplicate tool name `{}`",
                    tool.name()
                )));
            }
        }

        if let Some(name) = self.tool_choice.as_ref().and_then(ToolChoice::function_name) {
            if self.find_tool(name).is_none() {
                return Err(LlmError::InvalidParameter(format!(
                    "Tool choice names unknown tool `{name}`"
                )));
            }
        }

        Ok(())
    }
}

fn option(f: impl Fn(&mut CallOptions) + Send + Sync + 'static) -> CallOption {
    Arc::new(f)
}

/// Set the model id
pub fn with_model(model: impl Into<String>) -> CallOption {
    let model = model.into();
    option(move |o| o.model = Some(model.clone()))
}

/// Set the sampling temperature
pub fn with_temperature(temperature: f32) -> CallOption {
    option(move |o| o.temperature = Some(temperature))
}

/// Set nucleus sampling
pub fn with_top_p(top_p: f32) -> CallOption {
    option(move |o| o.top_p = Some(top_p))
}

/// Set maximum output tokens
pub fn with_max_tokens(max_tokens: u32) -> CallOption {
    option(move |o| o.max_tokens = Some(max_tokens))
}

/// Set stop sequences
pub fn with_stop_words(words: Vec<String>) -> CallOption {
    option(move |o| o.stop_words = words.clone())
}

/// Set the random seed
pub fn with_seed(seed: u64) -> CallOption {
    option(move |o| o.seed = Some(seed))
}

/// Ask for a JSON object response
pub fn with_json_mode() -> CallOption {
    option(|o| o.json_mode = true)
}

/// Ask for output matching a JSON schema; implies JSON mode
pub fn with_json_schema(
    name: impl Into<String>,
    schema: serde_json::Value,
    strict: bool,
) -> CallOption {
    let format = JsonSchemaFormat {
        name: name.into(),
        schema,
        strict,
    };
    option(move |o| {
        o.json_mode = true;
        o.json_schema = Some(format.clone());
    })
}

/// Set the tool list
pub fn with_tools(tools: Vec<Tool>) -> CallOption {
    option(move |o| o.tools = tools.clone())
}

/// Set the tool choice policy
pub fn with_tool_choice(choice: ToolChoice) -> CallOption {
    option(move |o| o.tool_choice = Some(choice.clone()))
}

/// Attach a streaming sink
pub fn with_stream(sink: StreamSink) -> CallOption {
    option(move |o| o.stream = Some(sink.clone()))
}

/// Set the reasoning effort
pub fn with_reasoning_effort(effort: ReasoningEffort) -> CallOption {
    option(move |o| o.reasoning_effort = Some(effort))
}

/// Set the verbosity
pub fn with_verbosity(verbosity: Verbosity) -> CallOption {
    option(move |o| o.verbosity = Some(verbosity))
}

/// Set the thinking level
pub fn with_thinking_level(level: ThinkingLevel) -> CallOption {
    option(move |o| o.thinking_level = Some(level))
}

/// Set the thinking token budget
pub fn with_thinking_budget(tokens: u32) -> CallOption {
    option(move |o| o.thinking_budget_tokens = Some(tokens))
}

/// Add one metadata entry
pub fn with_metadata(key: impl Into<String>, value: serde_json::Value) -> CallOption {
    let key = key.into();
    option(move |o| {
        o.metadata.insert(key.clone(), value.clone());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameters;
    use serde_json::json;

    fn read_file_tool() -> Tool {
        Tool::function(
            "read_file",
            "Read a file",
            Parameters::object().with_required_property("path", json!({"type": "string"})),
        )
    }

    #[test]
    fn option_functions_compose_in_order() {
        let opts = CallOptions::from_options(&[
            with_model("gpt-4o"),
            with_temperature(0.2),
            with_temperature(0.7),
            with_json_schema("answer", json!({"type": "object"}), true),
            with_metadata("trace", json!("abc")),
            with_reasoning_effort(ReasoningEffort::High),
        ]);
        assert_eq!(opts.model.as_deref(), Some("gpt-4o"));
        assert_eq!(opts.temperature, Some(0.7));
        assert!(opts.json_mode);
        assert_eq!(opts.json_schema.as_ref().map(|s| s.strict), Some(true));
        assert_eq!(opts.metadata["trace"], json!("abc"));
        assert_eq!(opts.reasoning_effort, Some(ReasoningEffort::High));
        assert!(!opts.is_streaming());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(CallOptions::new().temperature(-0.1).validate().is_err());
        assert!(CallOptions::new().max_tokens(0).validate().is_err());
        assert!(CallOptions::new().model("  ").validate().is_err());
        assert!(
            CallOptions::new()
                .tools(vec![read_file_tool(), read_file_tool()])
                .validate()
                .is_err()
        );
    }

    #[test]
    fn tool_choice_must_name_known_tool() {
        let opts = CallOptions::new()
            .tools(vec![read_file_tool()])
            .tool_choice(ToolChoice::function("write_file"));
        assert!(matches!(opts.validate(), Err(LlmError::InvalidParameter(_))));

        let opts = opts.tool_choice(ToolChoice::function("read_file"));
        assert!(opts.validate().is_ok());
    }
}
