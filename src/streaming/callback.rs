//! Callback-style stream consumption
//!
//! For callers that prefer a per-chunk callback over owning the receiver: a
//! drain worker pulls from the queue and invokes the callback. A callback
//! error stops the drain; the producer then sees a closed queue and the
//! error is reported from [`CallbackSink::finish`].

use tokio::task::JoinHandle;

use super::{StreamChunk, StreamSink, channel};
use crate::error::LlmError;

/// Handle to a running drain worker
#[derive(Debug)]
pub struct CallbackSink {
    handle: JoinHandle<Result<usize, LlmError>>,
}

impl CallbackSink {
    /// Spawn a drain worker. Returns the sink to attach to `CallOptions`.
    pub fn spawn<F>(capacity: usize, mut callback: F) -> (StreamSink, Self)
    where
        F: FnMut(StreamChunk) -> Result<(), LlmError> + Send + 'static,
    {
        let (sink, mut receiver) = channel(capacity);
        let handle = tokio::spawn(async move {
            let mut delivered = 0usize;
            while let Some(chunk) = receiver.recv().await {
                if let Err(e) = callback(chunk) {
                    tracing::debug!(error = %e, delivered, "stream callback failed, stopping drain");
                    return Err(e);
                }
                delivered += 1;
            }
            Ok(delivered)
        });
        (sink, Self { handle })
    }

    /// Spawn a drain worker that only sees content text
    pub fn spawn_text<F>(capacity: usize, mut callback: F) -> (StreamSink, Self)
    where
        F: FnMut(&str) -> Result<(), LlmError> + Send + 'static,
    {
        Self::spawn(capacity, move |chunk| match chunk {
            StreamChunk::Content { text } => callback(&text),
            StreamChunk::ToolCall { .. } => Ok(()),
        })
    }

    /// Wait for the drain to end. Returns the number of chunks delivered to
    /// the callback, or the callback's error.
    pub async fn finish(self) -> Result<usize, LlmError> {
        self.handle.await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn delivers_chunks_in_order() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink_seen = seen.clone();
        let (sink, worker) = CallbackSink::spawn_text(1, move |text| {
            sink_seen.lock().unwrap().push_str(text);
            Ok(())
        });

        let tx = sink.take().unwrap();
        for part in ["He", "llo"] {
            tx.send(StreamChunk::content(part)).await.unwrap();
        }
        drop(tx);

        assert_eq!(worker.finish().await.unwrap(), 2);
        assert_eq!(*seen.lock().unwrap(), "Hello");
    }

    #[tokio::test]
    async fn callback_error_closes_the_queue() {
        let (sink, worker) = CallbackSink::spawn(1, |_| {
            Err(LlmError::InvalidInput("consumer rejected chunk".into()))
        });
        let tx = sink.take().unwrap();
        tx.send(StreamChunk::content("a")).await.unwrap();

        let err = worker.finish().await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidInput(_)));
        assert!(tx.send(StreamChunk::content("b")).await.is_err());
    }
}
