//! Shared scenarios for the integration suites: vendor transcripts for the
//! scripted adapter and helpers that drive a streaming call end to end.
#![allow(dead_code)]

use serde_json::json;
use std::time::Duration;
use unillm::prelude::*;
use unillm::streaming::{StreamTranscript, channel, collect_chunks};

pub const PROVIDER: &str = "openai";
pub const MODEL: &str = "gpt-4o";

/// Plain greeting, split over several fragments
pub fn greeting() -> Vec<VendorEvent> {
    vec![
        VendorEvent::text("Hello"),
        VendorEvent::text("! How can I"),
        VendorEvent::text(" help you today?"),
        VendorEvent::stop("stop"),
    ]
}

pub fn read_file_tool() -> Tool {
    Tool::function(
        "read_file",
        "Read a file from the workspace",
        Parameters::object().with_required_property("path", json!({"type": "string"})),
    )
}

pub fn weather_tool() -> Tool {
    Tool::function(
        "get_weather",
        "Current weather for a city",
        Parameters::object()
            .with_required_property("city", json!({"type": "string"}))
            .with_property("unit", json!({"type": "string", "enum": ["c", "f"]})),
    )
}

/// A single `read_file` call whose arguments arrive in fragments, with a
/// continuation token attached
pub fn read_file_call() -> Vec<VendorEvent> {
    vec![
        VendorEvent::text("Let me look at that file."),
        VendorEvent::tool_call(
            ToolCallDelta::at(0)
                .id("call_read_1")
                .name("read_file")
                .thought_signature("sig-abc123"),
        ),
        VendorEvent::tool_call(ToolCallDelta::at(0).arguments("{\"pa")),
        VendorEvent::tool_call(ToolCallDelta::at(0).arguments("th\": \"go.")),
        VendorEvent::tool_call(ToolCallDelta::at(0).arguments("mod\"}")),
        VendorEvent::stop("tool_calls"),
    ]
}

/// Two calls in one turn, neither carrying a vendor id
pub fn parallel_calls() -> Vec<VendorEvent> {
    vec![
        VendorEvent::tool_call(ToolCallDelta::at(0).name("get_weather")),
        VendorEvent::tool_call(ToolCallDelta::at(1).name("get_weather")),
        VendorEvent::tool_call(ToolCallDelta::at(0).arguments("{\"city\": \"Paris\"}")),
        VendorEvent::tool_call(ToolCallDelta::at(1).arguments("{\"city\": \"Tokyo\"}")),
        VendorEvent::usage(usage_info()),
        VendorEvent::stop("tool_calls"),
    ]
}

/// Answer after tool results came back
pub fn final_answer(text: &str) -> Vec<VendorEvent> {
    vec![VendorEvent::text(text), VendorEvent::stop("stop")]
}

/// Anthropic-style counts plus cache usage in the extension bag
pub fn usage_info() -> GenerationInfo {
    GenerationInfo {
        input_tokens: Some(245),
        output_tokens: Some(89),
        ..Default::default()
    }
    .with_extra("cache_read_input_tokens", json!(100))
    .with_extra("cache_creation_input_tokens", json!(50))
}

/// Content that never finishes on its own
pub fn slow_stream() -> Vec<VendorEvent> {
    vec![
        VendorEvent::text("partial"),
        VendorEvent::pause(Duration::from_secs(30)),
        VendorEvent::text(" never arrives"),
    ]
}

pub fn scripted(turns: Vec<Vec<VendorEvent>>) -> ScriptedModel {
    turns
        .into_iter()
        .fold(ScriptedModel::builder(PROVIDER, MODEL), |b, t| b.turn(t))
        .build()
        .expect("valid scripted model")
}

/// Run one streaming call and collect everything the consumer saw
pub async fn generate_streaming(
    model: &dyn Model,
    ctx: &RequestContext,
    messages: &[ChatMessage],
    options: CallOptions,
) -> (Result<ContentResponse, LlmError>, StreamTranscript) {
    let (sink, rx) = channel(4);
    let consumer = tokio::spawn(collect_chunks(rx));
    let result = model.generate(ctx, messages, &options.stream(sink)).await;
    let transcript = consumer.await.expect("consumer task");
    (result, transcript)
}
