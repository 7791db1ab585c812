//! Tool Call Accumulator
//!
//! Vendors stream tool calls as fragments: an id and name first, then the
//! arguments JSON in pieces. The accumulator buffers fragments per call and
//! releases a call exactly once, when its arguments form a complete JSON
//! object or the vendor signals the call is done.
//!
//! Calls without a usable vendor id get `call_<seed>_<n>`. Seeding the
//! accumulator with a digest of the request and transcript makes those ids
//! identical on every replay of the same transcript.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::roundtrip::sanitize_arguments;
use crate::types::ToolCall;

/// One vendor tool-call fragment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolCallDelta {
    /// Position of the call within the turn, when the vendor reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Call id, usually only on the first fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Function name, usually only on the first fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Arguments fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Opaque reasoning signature
    #[serde(
        default,
        rename = "thoughtSignature",
        skip_serializing_if = "Option::is_none"
    )]
    pub thought_signature: Option<String>,
}

impl ToolCallDelta {
    /// Fragment addressed by index
    pub fn at(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    pub fn thought_signature(mut self, signature: impl Into<String>) -> Self {
        self.thought_signature = Some(signature.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
    thought_signature: Option<String>,
    finished: Option<ToolCall>,
}

/// Length of the seed prefix used in generated ids
const SEED_PREFIX_LEN: usize = 12;

/// Accumulates tool-call fragments into complete calls, in first-seen order
#[derive(Debug)]
pub struct ToolCallAccumulator {
    seed: String,
    calls: Vec<PendingCall>,
    by_index: HashMap<usize, usize>,
    by_id: HashMap<String, usize>,
    used_ids: HashSet<String>,
}

impl Default for ToolCallAccumulator {
    fn default() -> Self {
        Self::with_seed(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl ToolCallAccumulator {
    /// Accumulator with a random id seed
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator whose generated ids depend only on `seed` and call order
    pub fn with_seed(seed: impl Into<String>) -> Self {
        let seed: String = seed
            .into()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(SEED_PREFIX_LEN)
            .collect();
        Self {
            seed,
            calls: Vec::new(),
            by_index: HashMap::new(),
            by_id: HashMap::new(),
            used_ids: HashSet::new(),
        }
    }

    /// Number of calls seen so far
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Feed one fragment. Returns the call if this fragment completed it.
    pub fn push(&mut self, delta: ToolCallDelta) -> Option<ToolCall> {
        let slot = self.slot_for(&delta);
        let call = &mut self.calls[slot];

        if call.finished.is_some() {
            if delta.arguments.as_deref().is_some_and(|a| !a.is_empty()) {
                tracing::warn!(
                    tool_call_id = %call.id,
                    "ignoring argument fragment for an already completed tool call"
                );
            }
            return None;
        }

        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            if call.id.is_empty() {
                self.by_id.insert(id.clone(), slot);
                call.id = id;
            }
        }
        if let Some(name) = delta.name {
            // Some vendors split the name across fragments.
            call.name.push_str(&name);
        }
        if let Some(args) = delta.arguments {
            call.arguments.push_str(&args);
        }
        if delta.thought_signature.is_some() {
            call.thought_signature = delta.thought_signature;
        }

        if !call.name.is_empty() && is_complete_object(&call.arguments) {
            return Some(self.finish_slot(slot));
        }
        None
    }

    /// Vendor signalled the end of the call at `index`. Returns the call
    /// unless it was already released.
    pub fn complete(&mut self, index: usize) -> Option<ToolCall> {
        let slot = *self.by_index.get(&index)?;
        if self.calls[slot].finished.is_some() {
            return None;
        }
        Some(self.finish_slot(slot))
    }

    /// Vendor signalled the end of the call with `id`
    pub fn complete_id(&mut self, id: &str) -> Option<ToolCall> {
        let slot = *self.by_id.get(id)?;
        if self.calls[slot].finished.is_some() {
            return None;
        }
        Some(self.finish_slot(slot))
    }

    /// End of stream: release every call not yet released, in order
    pub fn finish(&mut self) -> Vec<ToolCall> {
        (0..self.calls.len())
            .filter(|&slot| self.calls[slot].finished.is_none())
            .collect::<Vec<_>>()
            .into_iter()
            .map(|slot| self.finish_slot(slot))
            .collect()
    }

    /// All released calls, in first-seen order
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.calls
            .iter()
            .filter_map(|c| c.finished.clone())
            .collect()
    }

    fn slot_for(&mut self, delta: &ToolCallDelta) -> usize {
        if let Some(index) = delta.index {
            if let Some(&slot) = self.by_index.get(&index) {
                return slot;
            }
            let slot = self.new_slot();
            self.by_index.insert(index, slot);
            return slot;
        }
        if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
            if let Some(&slot) = self.by_id.get(id) {
                return slot;
            }
            return self.new_slot();
        }
        // No index and no id: a continuation of the most recent call.
        match self.calls.len() {
            0 => self.new_slot(),
            n => n - 1,
        }
    }

    fn new_slot(&mut self) -> usize {
        self.calls.push(PendingCall::default());
        self.calls.len() - 1
    }

    fn finish_slot(&mut self, slot: usize) -> ToolCall {
        let call = &self.calls[slot];
        let mut id = call.id.clone();
        if id.is_empty() || self.used_ids.contains(&id) {
            let generated = self.generated_id(slot);
            if !id.is_empty() {
                tracing::warn!(duplicate_id = %id, new_id = %generated, "vendor reused a tool call id");
            }
            id = generated;
        }
        self.used_ids.insert(id.clone());

        let mut tool_call = ToolCall::new(id, call.name.clone(), sanitize_arguments(&call.arguments));
        if let Some(signature) = &call.thought_signature {
            tool_call = tool_call.with_thought_signature(signature.clone());
        }
        self.calls[slot].finished = Some(tool_call.clone());
        tool_call
    }
}

impl ToolCallAccumulator {
    fn generated_id(&self, slot: usize) -> String {
        let base = if self.seed.is_empty() {
            format!("call_{slot}")
        } else {
            format!("call_{}_{slot}", self.seed)
        };
        let mut id = base.clone();
        let mut attempt = 1;
        // A vendor id may already have this shape.
        while self.used_ids.contains(&id) {
            id = format!("{base}_{attempt}");
            attempt += 1;
        }
        id
    }
}

fn is_complete_object(arguments: &str) -> bool {
    let trimmed = arguments.trim();
    trimmed.starts_with('{')
        && trimmed.ends_with('}')
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok_and(|v| v.is_object())
}
