//! Request fingerprints
//!
//! A fingerprint identifies a vendor request independent of incidental
//! fields. The hash is SHA-256 over canonical JSON: object keys sorted at
//! every level, no insignificant whitespace.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::types::{CallOptions, ChatMessage};

/// Stable identity of one vendor request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestFingerprint {
    pub provider: String,
    pub model_id: String,
    pub test_name: String,
    /// Semantic request content
    pub content: Value,
}

impl RequestFingerprint {
    pub fn new(
        provider: impl Into<String>,
        model_id: impl Into<String>,
        test_name: impl Into<String>,
        content: Value,
    ) -> Self {
        Self {
            provider: provider.into(),
            model_id: model_id.into(),
            test_name: test_name.into(),
            content,
        }
    }

    /// Lowercase hex SHA-256 of the canonical JSON form
    pub fn request_hash(&self) -> String {
        let value = serde_json::json!({
            "provider": self.provider,
            "modelId": self.model_id,
            "testName": self.test_name,
            "content": self.content,
        });
        let hash = Sha256::digest(canonical_json(&value).as_bytes());
        format!("{hash:x}")
    }
}

/// Serialize `value` with object keys sorted at every level
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Semantic content of a generation request: the conversation plus every
/// option that changes what the vendor is asked. The stream sink and
/// metadata are left out.
pub fn request_content(messages: &[ChatMessage], options: &CallOptions) -> Value {
    serde_json::json!({
        "messages": messages,
        "temperature": options.temperature,
        "topP": options.top_p,
        "maxTokens": options.max_tokens,
        "stopWords": options.stop_words,
        "seed": options.seed,
        "jsonMode": options.json_mode,
        "jsonSchema": options.json_schema,
        "tools": options.tools,
        "toolChoice": options.tool_choice,
        "reasoningEffort": options.reasoning_effort,
        "verbosity": options.verbosity,
        "thinkingLevel": options.thinking_level,
        "thinkingBudgetTokens": options.thinking_budget_tokens,
    })
}
