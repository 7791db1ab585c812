//! Streaming Module
//!
//! The chunk contract every adapter satisfies, over a caller-supplied bounded
//! queue:
//! - `StreamChunk` - content fragment or complete tool call
//! - `StreamSink` / `StreamReceiver` - the two ends of the queue
//! - `StreamEmitter` - producer-side state machine
//! - `ToolCallAccumulator` - turns vendor fragments into complete tool calls
//! - `collect_chunks` / `chunk_stream` - consumer-side helpers
//! - `CallbackSink` - callback-style consumption on a drain worker

mod accumulator;
mod callback;
mod collect;
mod emitter;

pub use accumulator::*;
pub use callback::*;
pub use collect::*;
pub use emitter::*;

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::types::ToolCall;

/// Default queue capacity used by [`channel_default`]
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// One unit of streamed output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Content fragment, in final-content order
    Content { text: String },
    /// A complete tool call with valid JSON arguments
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },
}

impl StreamChunk {
    /// Content chunk
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    /// Tool call chunk
    pub fn tool_call(call: ToolCall) -> Self {
        Self::ToolCall { tool_call: call }
    }
}

/// Receiving end of a stream queue
pub type StreamReceiver = mpsc::Receiver<StreamChunk>;

/// Sending end of a stream queue, as attached to `CallOptions`.
///
/// The sender lives in a shared slot so that cloning `CallOptions` does not
/// keep the queue open: the adapter serving the call takes the sender out,
/// and dropping it closes the queue. A sink serves exactly one call.
#[derive(Clone)]
pub struct StreamSink {
    slot: Arc<Mutex<Option<mpsc::Sender<StreamChunk>>>>,
}

impl StreamSink {
    /// Wrap an existing sender
    pub fn new(sender: mpsc::Sender<StreamChunk>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Take the sender; `None` if another call already took it
    pub fn take(&self) -> Option<mpsc::Sender<StreamChunk>> {
        match self.slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Whether the sender is still available
    pub fn is_available(&self) -> bool {
        match self.slot.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl std::fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSink")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Create a bounded stream queue
pub fn channel(capacity: usize) -> (StreamSink, StreamReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (StreamSink::new(tx), rx)
}

/// Create a stream queue with [`DEFAULT_STREAM_CAPACITY`]
pub fn channel_default() -> (StreamSink, StreamReceiver) {
    channel(DEFAULT_STREAM_CAPACITY)
}
