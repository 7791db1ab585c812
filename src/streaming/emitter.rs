//! Producer-side stream state machine.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::StreamChunk;
use crate::error::LlmError;
use crate::types::ToolCall;

/// Per-request stream state, as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

impl StreamState {
    /// Whether the queue has been closed
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Pushes chunks onto the caller's queue on behalf of an adapter.
///
/// - Content is recorded even when no sink is attached, so the final content
///   can be built from exactly the fragments that were streamed.
/// - Sends observe the cancellation token while waiting on a full queue.
/// - `complete`/`fail` (or dropping the emitter) close the queue.
#[derive(Debug)]
pub struct StreamEmitter {
    sender: Option<mpsc::Sender<StreamChunk>>,
    cancel: CancellationToken,
    state: StreamState,
    content: String,
    tool_call_ids: Vec<String>,
    delivered: usize,
}

impl StreamEmitter {
    /// Create an emitter; `sender` is `None` for non-streaming calls
    pub fn new(sender: Option<mpsc::Sender<StreamChunk>>, cancel: CancellationToken) -> Self {
        Self {
            sender,
            cancel,
            state: StreamState::Idle,
            content: String::new(),
            tool_call_ids: Vec::new(),
            delivered: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// All content passed to `emit_content` so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Ids of all tool calls passed to `emit_tool_call` so far
    pub fn tool_call_ids(&self) -> &[String] {
        &self.tool_call_ids
    }

    /// Number of chunks the queue accepted
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Emit a content fragment. Empty fragments are skipped.
    pub async fn emit_content(&mut self, text: impl Into<String>) -> Result<(), LlmError> {
        let text = text.into();
        if text.is_empty() {
            return Ok(());
        }
        self.begin()?;
        self.content.push_str(&text);
        self.send(StreamChunk::Content { text }).await
    }

    /// Emit a complete tool call
    pub async fn emit_tool_call(&mut self, call: ToolCall) -> Result<(), LlmError> {
        self.begin()?;
        self.tool_call_ids.push(call.id.clone());
        self.send(StreamChunk::ToolCall { tool_call: call }).await
    }

    /// Mark the stream completed and close the queue
    pub fn complete(&mut self) {
        if !self.state.is_terminal() {
            self.state = StreamState::Completed;
        }
        self.sender = None;
    }

    /// Mark the stream failed and close the queue
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = StreamState::Failed;
        }
        self.sender = None;
    }

    fn begin(&mut self) -> Result<(), LlmError> {
        match self.state {
            StreamState::Idle => {
                self.state = StreamState::Streaming;
                Ok(())
            }
            StreamState::Streaming => Ok(()),
            terminal => Err(LlmError::StreamError(format!(
                "chunk emitted after the stream was {terminal:?}"
            ))),
        }
    }

    async fn send(&mut self, chunk: StreamChunk) -> Result<(), LlmError> {
        if self.cancel.is_cancelled() {
            self.fail();
            return Err(LlmError::Cancelled);
        }
        let Some(sender) = self.sender.as_ref() else {
            return Ok(());
        };
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            sent = sender.send(chunk) => Some(sent.is_ok()),
        };
        match outcome {
            None => {
                self.fail();
                Err(LlmError::Cancelled)
            }
            Some(true) => {
                self.delivered += 1;
                Ok(())
            }
            Some(false) => {
                // The consumer went away; the final response stays authoritative.
                tracing::debug!("stream consumer dropped, continuing without streaming");
                self.sender = None;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn content_is_tracked_and_queue_closes_on_complete() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut emitter = StreamEmitter::new(Some(tx), CancellationToken::new());
        assert_eq!(emitter.state(), StreamState::Idle);

        emitter.emit_content("Hel").await.unwrap();
        emitter.emit_content("").await.unwrap();
        emitter.emit_content("lo").await.unwrap();
        assert_eq!(emitter.state(), StreamState::Streaming);
        emitter.complete();
        assert_eq!(emitter.state(), StreamState::Completed);

        assert_eq!(rx.recv().await, Some(StreamChunk::content("Hel")));
        assert_eq!(rx.recv().await, Some(StreamChunk::content("lo")));
        assert_eq!(rx.recv().await, None);
        assert_eq!(emitter.content(), "Hello");
        assert_eq!(emitter.delivered(), 2);
    }

    #[tokio::test]
    async fn emitting_after_completion_is_an_error() {
        let mut emitter = StreamEmitter::new(None, CancellationToken::new());
        emitter.emit_content("x").await.unwrap();
        emitter.complete();
        let err = emitter.emit_content("y").await.unwrap_err();
        assert!(matches!(err, LlmError::StreamError(_)));
    }

    #[tokio::test]
    async fn cancellation_unblocks_a_full_queue() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let mut emitter = StreamEmitter::new(Some(tx), cancel.clone());
        emitter.emit_content("fills the queue").await.unwrap();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let err = tokio::time::timeout(Duration::from_secs(1), emitter.emit_content("blocked"))
            .await
            .expect("send must observe cancellation")
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err, LlmError::Cancelled);
        assert_eq!(emitter.state(), StreamState::Failed);
        assert_eq!(rx.recv().await, Some(StreamChunk::content("fills the queue")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn dropped_consumer_does_not_fail_generation() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut emitter = StreamEmitter::new(Some(tx), CancellationToken::new());
        emitter.emit_content("a").await.unwrap();
        emitter.emit_content("b").await.unwrap();
        assert_eq!(emitter.content(), "ab");
        assert_eq!(emitter.delivered(), 0);
    }
}
