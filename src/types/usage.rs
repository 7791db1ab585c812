//! Token accounting
//!
//! Vendors report token counts under many different names. Adapters copy
//! whatever they receive into [`GenerationInfo`]; callers read the
//! normalized [`Usage`] produced by [`normalize_usage`].

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Extension-bag keys holding cache read counts.
const CACHE_READ_KEYS: [&str; 2] = ["CacheReadInputTokens", "cache_read_input_tokens"];

/// Extension-bag keys holding cache creation counts.
const CACHE_CREATION_KEYS: [&str; 2] = ["CacheCreationInputTokens", "cache_creation_input_tokens"];

/// Raw, vendor-shaped generation metadata.
///
/// Every naming convention vendors use for token counts gets its own field;
/// anything else lands in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationInfo {
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(
        rename = "InputTokens",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_tokens_pascal: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(
        rename = "PromptTokens",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_tokens_pascal: Option<u64>,

    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(
        rename = "OutputTokens",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_tokens_pascal: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(
        rename = "CompletionTokens",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_tokens_pascal: Option<u64>,

    #[serde(default, deserialize_with = "lenient_count", skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(
        rename = "TotalTokens",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_tokens_pascal: Option<u64>,

    #[serde(
        rename = "ReasoningTokens",
        alias = "reasoning_tokens",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub reasoning_tokens: Option<u64>,
    #[serde(
        rename = "ThoughtsTokens",
        alias = "thoughts_tokens",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub thoughts_tokens: Option<u64>,
    #[serde(
        rename = "CachedContentTokens",
        alias = "cached_content_tokens",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub cached_content_tokens: Option<u64>,

    /// Open extension map for everything else
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl GenerationInfo {
    /// Insert an extension value
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Normalize into [`Usage`]
    pub fn usage(&self) -> Option<Usage> {
        normalize_usage(self)
    }
}

/// Canonical token usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Input tokens consumed
    pub input_tokens: u64,
    /// Output tokens generated
    pub output_tokens: u64,
    /// Total tokens, as reported or derived
    pub total_tokens: u64,
    /// Reasoning tokens (OpenAI o-series style)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    /// Thought tokens (Gemini style)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thoughts_tokens: Option<u64>,
    /// Cache read + cache creation + cached content tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_tokens: Option<u64>,
}

impl Usage {
    /// Create usage from input and output counts
    pub const fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            reasoning_tokens: None,
            thoughts_tokens: None,
            cache_tokens: None,
        }
    }

    /// Whether every count is zero
    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0
            && self.output_tokens == 0
            && self.total_tokens == 0
            && self.reasoning_tokens.unwrap_or(0) == 0
            && self.thoughts_tokens.unwrap_or(0) == 0
            && self.cache_tokens.unwrap_or(0) == 0
    }

    /// Accumulate another turn's usage, e.g. across an agent loop
    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
        self.reasoning_tokens = add_optional(self.reasoning_tokens, other.reasoning_tokens);
        self.thoughts_tokens = add_optional(self.thoughts_tokens, other.thoughts_tokens);
        self.cache_tokens = add_optional(self.cache_tokens, other.cache_tokens);
    }
}

fn add_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
    }
}

/// First reported count in priority order. A reported zero wins over
/// later fields.
fn first_count(candidates: &[Option<u64>]) -> u64 {
    candidates.iter().flatten().next().copied().unwrap_or(0)
}

/// Coerce an extension value holding an integer or a float.
fn extra_count(extra: &HashMap<String, serde_json::Value>, keys: &[&str]) -> u64 {
    keys.iter()
        .filter_map(|k| extra.get(*k))
        .find_map(json_count)
        .unwrap_or(0)
}

fn json_count(value: &serde_json::Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f.round() as u64)
}

/// Normalize raw generation metadata into canonical usage.
///
/// Returns `None` when nothing was reported, so "no usage" stays
/// distinguishable from "zero usage reported".
pub fn normalize_usage(info: &GenerationInfo) -> Option<Usage> {
    let input_tokens = first_count(&[
        info.input_tokens,
        info.input_tokens_pascal,
        info.prompt_tokens,
        info.prompt_tokens_pascal,
    ]);
    let output_tokens = first_count(&[
        info.output_tokens,
        info.output_tokens_pascal,
        info.completion_tokens,
        info.completion_tokens_pascal,
    ]);
    // Direct fields only; derivation happens below.
    let mut total_tokens = first_count(&[info.total_tokens, info.total_tokens_pascal]);

    let cache = info
        .cached_content_tokens
        .unwrap_or(0)
        .saturating_add(extra_count(&info.extra, &CACHE_READ_KEYS))
        .saturating_add(extra_count(&info.extra, &CACHE_CREATION_KEYS));

    // A vendor total may already include reasoning/thought tokens, so only
    // derive when no total was reported at all.
    if total_tokens == 0 && input_tokens > 0 && output_tokens > 0 {
        total_tokens = input_tokens.saturating_add(output_tokens);
    }

    let usage = Usage {
        input_tokens,
        output_tokens,
        total_tokens,
        reasoning_tokens: info.reasoning_tokens,
        thoughts_tokens: info.thoughts_tokens,
        cache_tokens: (cache > 0).then_some(cache),
    };

    if usage.is_empty() { None } else { Some(usage) }
}

/// Accept token counts encoded as integers or floats.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => json_count(&v).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a non-negative token count, got {v}"))
        }),
    }
}
