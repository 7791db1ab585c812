//! Conformance checks
//!
//! Assertions a provider conformance suite runs against every adapter. Each
//! check returns the list of violations it found instead of stopping at the
//! first one, so a single run reports everything wrong with a response.

use std::collections::HashMap;

use crate::error::LlmError;
use crate::roundtrip::{ArgumentOmission, RequiredArguments, check_required_arguments};
use crate::streaming::StreamTranscript;
use crate::types::{ContentResponse, Tool};

/// One broken contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Streamed content does not concatenate to the final content
    ContentMismatch { streamed: String, returned: String },
    /// Different number of streamed and returned tool calls
    ToolCallCountMismatch { streamed: usize, returned: usize },
    /// Streamed and returned tool call ids differ as multisets
    ToolCallIdMismatch {
        streamed: Vec<String>,
        returned: Vec<String>,
    },
    EmptyToolCallId { index: usize },
    DuplicateToolCallId { id: String },
    /// Arguments are not a JSON object
    MalformedArguments { id: String, message: String },
    /// The model called a tool that was not offered
    UnknownTool { id: String, name: String },
    /// Required arguments missing, outside the relaxed model family
    MissingRequiredArguments {
        id: String,
        tool: String,
        missing: Vec<String>,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContentMismatch { streamed, returned } => write!(
                f,
                "streamed content ({} bytes) differs from final content ({} bytes)",
                streamed.len(),
                returned.len()
            ),
            Self::ToolCallCountMismatch { streamed, returned } => write!(
                f,
                "{streamed} tool calls streamed, {returned} returned"
            ),
            Self::ToolCallIdMismatch { streamed, returned } => write!(
                f,
                "streamed tool call ids {streamed:?} differ from returned ids {returned:?}"
            ),
            Self::EmptyToolCallId { index } => write!(f, "tool call #{index} has an empty id"),
            Self::DuplicateToolCallId { id } => write!(f, "tool call id `{id}` is not unique"),
            Self::MalformedArguments { id, message } => {
                write!(f, "tool call `{id}` has malformed arguments: {message}")
            }
            Self::UnknownTool { id, name } => {
                write!(f, "tool call `{id}` names unknown tool `{name}`")
            }
            Self::MissingRequiredArguments { id, tool, missing } => write!(
                f,
                "tool call `{id}` to `{tool}` is missing {}",
                missing.join(", ")
            ),
        }
    }
}

/// Result of a full conformance run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConformanceReport {
    pub violations: Vec<Violation>,
    /// Tolerated omissions of the relaxed model family, keyed by call id
    pub flagged: Vec<(String, ArgumentOmission)>,
}

impl ConformanceReport {
    pub fn is_conformant(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Err(StreamError)` listing every violation, if any
    pub fn into_result(self) -> Result<(), LlmError> {
        if self.violations.is_empty() {
            return Ok(());
        }
        let details: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        Err(LlmError::StreamError(details.join("; ")))
    }
}

/// Streamed output must agree with the final response
pub fn check_streaming(transcript: &StreamTranscript, response: &ContentResponse) -> Vec<Violation> {
    let mut violations = Vec::new();
    if transcript.content != response.content() {
        violations.push(Violation::ContentMismatch {
            streamed: transcript.content.clone(),
            returned: response.content().to_string(),
        });
    }

    let returned = response.tool_calls();
    if transcript.tool_calls.len() != returned.len() {
        violations.push(Violation::ToolCallCountMismatch {
            streamed: transcript.tool_calls.len(),
            returned: returned.len(),
        });
    }

    let streamed_ids: Vec<String> = transcript.tool_calls.iter().map(|c| c.id.clone()).collect();
    let returned_ids: Vec<String> = returned.iter().map(|c| c.id.clone()).collect();
    if multiset(&streamed_ids) != multiset(&returned_ids) {
        violations.push(Violation::ToolCallIdMismatch {
            streamed: streamed_ids,
            returned: returned_ids,
        });
    }
    violations
}

/// Tool calls must have unique non-empty ids and JSON object arguments
pub fn check_tool_calls(response: &ContentResponse) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (index, call) in response.tool_calls().iter().enumerate() {
        if call.id.trim().is_empty() {
            violations.push(Violation::EmptyToolCallId { index });
        } else {
            let count = seen.entry(call.id.as_str()).or_default();
            *count += 1;
            if *count == 2 {
                violations.push(Violation::DuplicateToolCallId {
                    id: call.id.clone(),
                });
            }
        }
        match call.parsed_arguments() {
            Ok(value) if value.is_object() => {}
            Ok(_) => violations.push(Violation::MalformedArguments {
                id: call.id.clone(),
                message: "arguments are not a JSON object".to_string(),
            }),
            Err(e) => violations.push(Violation::MalformedArguments {
                id: call.id.clone(),
                message: e.to_string(),
            }),
        }
    }
    violations
}

/// Every call must name an offered tool and carry its required arguments
pub fn check_required_fields(
    response: &ContentResponse,
    tools: &[Tool],
    model_id: &str,
) -> ConformanceReport {
    let mut report = ConformanceReport::default();
    for call in response.tool_calls() {
        let Some(tool) = tools.iter().find(|t| t.name() == call.name()) else {
            report.violations.push(Violation::UnknownTool {
                id: call.id.clone(),
                name: call.name().to_string(),
            });
            continue;
        };
        match check_required_arguments(model_id, tool, call) {
            Ok(RequiredArguments::Satisfied) => {}
            Ok(RequiredArguments::Flagged(omission)) => {
                report.flagged.push((call.id.clone(), omission));
            }
            Err(LlmError::MissingRequiredArguments { tool, missing }) => {
                report.violations.push(Violation::MissingRequiredArguments {
                    id: call.id.clone(),
                    tool,
                    missing,
                });
            }
            // Malformed arguments are reported by `check_tool_calls`.
            Err(_) => {}
        }
    }
    report
}

/// Run every check. `transcript` is `None` for non-streaming calls.
pub fn check_response(
    transcript: Option<&StreamTranscript>,
    response: &ContentResponse,
    tools: &[Tool],
    model_id: &str,
) -> ConformanceReport {
    let mut report = check_required_fields(response, tools, model_id);
    let mut violations = Vec::new();
    if let Some(transcript) = transcript {
        violations.extend(check_streaming(transcript, response));
    }
    violations.extend(check_tool_calls(response));
    violations.append(&mut report.violations);
    report.violations = violations;
    report
}

fn multiset(ids: &[String]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for id in ids {
        *counts.entry(id.as_str()).or_insert(0) += 1;
    }
    counts
}
