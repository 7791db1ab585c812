//! Lifecycle events
//!
//! Adapters report initialization and generation outcomes to an
//! [`EventEmitter`]. Emitters observe only: they cannot alter a request or
//! its result.

use std::sync::Arc;

use crate::error::LlmError;
use crate::types::{ContentResponse, ToolCall};

/// Who an event is about
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub provider: &'a str,
    pub model_id: &'a str,
}

impl<'a> EventContext<'a> {
    pub fn new(provider: &'a str, model_id: &'a str) -> Self {
        Self { provider, model_id }
    }
}

/// Observer of adapter lifecycle events. Every hook defaults to a no-op.
pub trait EventEmitter: Send + Sync {
    /// An adapter is being constructed.
    fn init_start(&self, _ctx: EventContext<'_>) {}

    /// Construction succeeded.
    fn init_success(&self, _ctx: EventContext<'_>) {}

    /// Construction failed.
    fn init_error(&self, _ctx: EventContext<'_>, _error: &LlmError) {}

    /// A generation call returned a response.
    fn generation_success(&self, _ctx: EventContext<'_>, _response: &ContentResponse) {}

    /// A generation call failed.
    fn generation_error(&self, _ctx: EventContext<'_>, _error: &LlmError) {}

    /// A complete tool call was produced.
    fn tool_call_detected(&self, _ctx: EventContext<'_>, _call: &ToolCall) {}
}

/// Shared emitter handle
pub type SharedEmitter = Arc<dyn EventEmitter>;

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {}

/// Writes events to `tracing` (no message content)
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

impl EventEmitter for TracingEmitter {
    fn init_start(&self, ctx: EventContext<'_>) {
        tracing::debug!(target: "unillm::events", provider = ctx.provider, model = ctx.model_id, "initializing model");
    }

    fn init_success(&self, ctx: EventContext<'_>) {
        tracing::info!(target: "unillm::events", provider = ctx.provider, model = ctx.model_id, "model ready");
    }

    fn init_error(&self, ctx: EventContext<'_>, error: &LlmError) {
        tracing::warn!(target: "unillm::events", provider = ctx.provider, model = ctx.model_id, error = %error, "model initialization failed");
    }

    fn generation_success(&self, ctx: EventContext<'_>, response: &ContentResponse) {
        let usage = response.usage().unwrap_or_default();
        tracing::info!(
            target: "unillm::events",
            provider = ctx.provider,
            model = ctx.model_id,
            content_len = response.content().len(),
            tool_calls = response.tool_calls().len(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "generation completed"
        );
    }

    fn generation_error(&self, ctx: EventContext<'_>, error: &LlmError) {
        tracing::warn!(
            target: "unillm::events",
            provider = ctx.provider,
            model = ctx.model_id,
            category = ?error.category(),
            error = %error,
            "generation failed"
        );
    }

    fn tool_call_detected(&self, ctx: EventContext<'_>, call: &ToolCall) {
        tracing::debug!(
            target: "unillm::events",
            provider = ctx.provider,
            model = ctx.model_id,
            tool = call.name(),
            tool_call_id = %call.id,
            "tool call detected"
        );
    }
}
