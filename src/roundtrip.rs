//! Tool-Call Round-Trip Contract
//!
//! A tool round trip is: the model issues tool calls, the caller runs them,
//! and the assistant turn plus the results go back to the model. These
//! helpers keep the conversation in the shape every vendor accepts:
//!
//! - tool call ids are non-empty and unique within a turn
//! - arguments are always a JSON object (`"{}"` when absent or malformed)
//! - all results for one assistant turn travel in a single tool message
//! - tool calls are resent verbatim, thought signatures included

use std::collections::{HashMap, HashSet};

use crate::error::LlmError;
use crate::types::{ChatMessage, ContentChoice, ContentPart, MessageRole, Tool, ToolCall};

/// Model-id prefixes of the family whose required-argument omissions are
/// flagged rather than failed.
pub const RELAXED_REQUIRED_ARGUMENT_PREFIXES: [&str; 6] = [
    "anthropic.",
    "us.anthropic.",
    "eu.anthropic.",
    "apac.anthropic.",
    "global.anthropic.",
    "bedrock/",
];

/// Arguments used when a vendor sends none or sends something unparseable
pub const EMPTY_ARGUMENTS: &str = "{}";

/// Normalize raw argument text to a JSON object document.
///
/// Valid objects are returned unchanged (trimmed). Empty, malformed and
/// non-object documents become `"{}"`.
pub fn sanitize_arguments(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return EMPTY_ARGUMENTS.to_string();
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) if value.is_object() => trimmed.to_string(),
        Ok(_) | Err(_) => {
            tracing::debug!(arguments = trimmed, "replacing malformed tool arguments with {{}}");
            EMPTY_ARGUMENTS.to_string()
        }
    }
}

/// Sanitize a tool call's arguments in place of a copy
pub fn sanitize_tool_call(mut call: ToolCall) -> ToolCall {
    call.function_call.arguments = sanitize_arguments(&call.function_call.arguments);
    call
}

/// Ids must be non-empty and unique within one response
pub fn validate_tool_call_ids(calls: &[ToolCall]) -> Result<(), LlmError> {
    let mut seen = HashSet::new();
    for (i, call) in calls.iter().enumerate() {
        if call.id.trim().is_empty() {
            return Err(LlmError::InvalidHistory(format!(
                "tool call #{i} (`{}`) has an empty id",
                call.name()
            )));
        }
        if !seen.insert(call.id.as_str()) {
            return Err(LlmError::InvalidHistory(format!(
                "duplicate tool call id `{}`",
                call.id
            )));
        }
    }
    Ok(())
}

/// Whether `model_id` belongs to the relaxed required-argument family
pub fn relaxes_required_arguments(model_id: &str) -> bool {
    let model_id = model_id.to_ascii_lowercase();
    RELAXED_REQUIRED_ARGUMENT_PREFIXES
        .iter()
        .any(|prefix| model_id.starts_with(prefix))
}

/// Why required arguments were missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentOmission {
    /// The argument object was empty: usually an accumulation bug upstream
    Total { missing: Vec<String> },
    /// Some required arguments were present
    Partial { missing: Vec<String> },
}

impl ArgumentOmission {
    pub fn missing(&self) -> &[String] {
        match self {
            Self::Total { missing } | Self::Partial { missing } => missing,
        }
    }
}

/// Outcome of a required-argument check that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredArguments {
    Satisfied,
    /// Missing arguments tolerated for this model family
    Flagged(ArgumentOmission),
}

/// Check that every required schema property is present in the call.
///
/// Missing properties fail with `MissingRequiredArguments`, except for
/// models in [`RELAXED_REQUIRED_ARGUMENT_PREFIXES`], where the omission is
/// flagged and logged instead.
pub fn check_required_arguments(
    model_id: &str,
    tool: &Tool,
    call: &ToolCall,
) -> Result<RequiredArguments, LlmError> {
    let arguments = call.parsed_arguments()?;
    let Some(object) = arguments.as_object() else {
        return Err(LlmError::MalformedToolArguments {
            tool: call.name().to_string(),
            message: "arguments are not a JSON object".to_string(),
        });
    };

    let missing: Vec<String> = tool
        .required()
        .iter()
        .filter(|name| !object.contains_key(name.as_str()))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(RequiredArguments::Satisfied);
    }

    if !relaxes_required_arguments(model_id) {
        return Err(LlmError::MissingRequiredArguments {
            tool: call.name().to_string(),
            missing,
        });
    }

    let omission = if object.is_empty() {
        ArgumentOmission::Total { missing }
    } else {
        ArgumentOmission::Partial { missing }
    };
    match &omission {
        ArgumentOmission::Total { missing } => tracing::warn!(
            model = model_id,
            tool = call.name(),
            tool_call_id = %call.id,
            ?missing,
            "tool call arrived with no arguments at all; the argument stream was likely lost"
        ),
        ArgumentOmission::Partial { missing } => tracing::warn!(
            model = model_id,
            tool = call.name(),
            tool_call_id = %call.id,
            ?missing,
            "tool call omitted required arguments"
        ),
    }
    Ok(RequiredArguments::Flagged(omission))
}

/// The assistant turn to append to history for `choice`.
///
/// Text comes first, then the tool calls exactly as received.
pub fn assistant_message(choice: &ContentChoice) -> ChatMessage {
    let mut parts = Vec::with_capacity(choice.tool_calls.len() + 1);
    if !choice.content.is_empty() {
        parts.push(ContentPart::text(choice.content.clone()));
    }
    parts.extend(choice.tool_calls.iter().cloned().map(ContentPart::tool_call));
    ChatMessage::ai_with_parts(parts)
}

/// Build the single tool message carrying all results of one turn
pub fn tool_results_message(results: Vec<ContentPart>) -> Result<ChatMessage, LlmError> {
    if results.is_empty() {
        return Err(LlmError::InvalidHistory(
            "a tool message needs at least one result".to_string(),
        ));
    }
    if let Some(other) = results
        .iter()
        .find(|p| !matches!(p, ContentPart::ToolCallResponse { .. }))
    {
        return Err(LlmError::InvalidHistory(format!(
            "tool messages carry only tool_call_response parts, got `{}`",
            other.kind()
        )));
    }
    Ok(ChatMessage::tool(results))
}

/// Append an assistant turn and its tool results to `history`.
///
/// Every result must answer a call of `assistant`, each call at most once.
/// Results are reordered to follow the call order.
pub fn append_round_trip(
    history: &mut Vec<ChatMessage>,
    assistant: ChatMessage,
    results: Vec<ContentPart>,
) -> Result<(), LlmError> {
    if assistant.role != MessageRole::Ai {
        return Err(LlmError::InvalidHistory(format!(
            "expected an ai message, got `{}`",
            assistant.role
        )));
    }
    let calls: Vec<&ToolCall> = assistant.tool_calls().collect();
    if calls.is_empty() {
        return Err(LlmError::InvalidHistory(
            "assistant message has no tool calls to answer".to_string(),
        ));
    }
    validate_tool_call_ids(&calls.iter().map(|c| (*c).clone()).collect::<Vec<_>>())?;

    let position: HashMap<&str, usize> = calls
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();
    let mut ordered: Vec<(usize, ContentPart)> = Vec::with_capacity(results.len());
    let mut answered = HashSet::new();
    for part in results {
        let ContentPart::ToolCallResponse {
            tool_call_id, name, ..
        } = &part
        else {
            return Err(LlmError::InvalidHistory(format!(
                "tool results must be tool_call_response parts, got `{}`",
                part.kind()
            )));
        };
        let Some(&index) = position.get(tool_call_id.as_str()) else {
            return Err(LlmError::InvalidHistory(format!(
                "tool result `{tool_call_id}` does not answer any call of this turn"
            )));
        };
        if calls[index].name() != name.as_str() {
            return Err(LlmError::InvalidHistory(format!(
                "tool result `{tool_call_id}` names `{name}`, call was `{}`",
                calls[index].name()
            )));
        }
        if !answered.insert(index) {
            return Err(LlmError::InvalidHistory(format!(
                "tool call `{tool_call_id}` answered more than once"
            )));
        }
        ordered.push((index, part));
    }
    ordered.sort_by_key(|(index, _)| *index);
    let message = tool_results_message(ordered.into_iter().map(|(_, p)| p).collect())?;

    history.push(assistant);
    history.push(message);
    Ok(())
}

/// Merge runs of consecutive tool messages into one message each
pub fn regroup_tool_results(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut out: Vec<ChatMessage> = Vec::with_capacity(messages.len());
    for message in messages {
        match out.last_mut() {
            Some(last) if last.role == MessageRole::Tool && message.role == MessageRole::Tool => {
                last.parts.extend(message.parts);
            }
            _ => out.push(message),
        }
    }
    out
}

/// Check a conversation against the round-trip rules.
///
/// Rejects tool results that answer no earlier call, answer a call twice,
/// resolve to more than one call, or are scattered across several tool
/// messages for the same assistant turn.
pub fn validate_history(messages: &[ChatMessage]) -> Result<(), LlmError> {
    // id -> (turn index, name)
    let mut calls: HashMap<&str, (usize, &str)> = HashMap::new();
    let mut answered: HashSet<&str> = HashSet::new();
    let mut answered_turns: HashSet<usize> = HashSet::new();

    for (turn, message) in messages.iter().enumerate() {
        match message.role {
            MessageRole::Ai => {
                for call in message.tool_calls() {
                    if call.id.trim().is_empty() {
                        return Err(LlmError::InvalidHistory(format!(
                            "message {turn}: tool call `{}` has an empty id",
                            call.name()
                        )));
                    }
                    if calls.insert(call.id.as_str(), (turn, call.name())).is_some() {
                        return Err(LlmError::InvalidHistory(format!(
                            "message {turn}: tool call id `{}` is used by more than one call",
                            call.id
                        )));
                    }
                }
            }
            MessageRole::Tool => {
                let mut turns_here = HashSet::new();
                for part in &message.parts {
                    let ContentPart::ToolCallResponse {
                        tool_call_id, name, ..
                    } = part
                    else {
                        return Err(LlmError::InvalidHistory(format!(
                            "message {turn}: tool messages carry only tool_call_response parts, got `{}`",
                            part.kind()
                        )));
                    };
                    let Some(&(call_turn, call_name)) = calls.get(tool_call_id.as_str()) else {
                        return Err(LlmError::InvalidHistory(format!(
                            "message {turn}: tool result `{tool_call_id}` answers no earlier tool call"
                        )));
                    };
                    if call_name != name.as_str() {
                        return Err(LlmError::InvalidHistory(format!(
                            "message {turn}: tool result `{tool_call_id}` names `{name}`, call was `{call_name}`"
                        )));
                    }
                    if !answered.insert(tool_call_id.as_str()) {
                        return Err(LlmError::InvalidHistory(format!(
                            "message {turn}: tool call `{tool_call_id}` answered more than once"
                        )));
                    }
                    turns_here.insert(call_turn);
                }
                for call_turn in turns_here {
                    if !answered_turns.insert(call_turn) {
                        return Err(LlmError::InvalidHistory(format!(
                            "message {turn}: results for the tool calls of message {call_turn} are scattered across several tool messages"
                        )));
                    }
                }
            }
            _ => {
                if let Some(part) = message
                    .parts
                    .iter()
                    .find(|p| matches!(p, ContentPart::ToolCallResponse { .. }))
                {
                    return Err(LlmError::InvalidHistory(format!(
                        "message {turn}: `{}` parts belong in tool messages",
                        part.kind()
                    )));
                }
            }
        }
    }
    Ok(())
}
