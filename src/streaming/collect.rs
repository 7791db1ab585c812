//! Consumer-side helpers.

use futures::Stream;

use super::{StreamChunk, StreamReceiver};
use crate::types::ToolCall;

/// Everything a consumer observed on one stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamTranscript {
    /// Concatenation of all content chunks, in arrival order
    pub content: String,
    /// Tool calls, in arrival order
    pub tool_calls: Vec<ToolCall>,
    /// Total chunks received
    pub chunks: usize,
}

impl StreamTranscript {
    /// Record one chunk
    pub fn push(&mut self, chunk: StreamChunk) {
        self.chunks += 1;
        match chunk {
            StreamChunk::Content { text } => self.content.push_str(&text),
            StreamChunk::ToolCall { tool_call } => self.tool_calls.push(tool_call),
        }
    }

    /// Ids of the streamed tool calls, in arrival order
    pub fn tool_call_ids(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|c| c.id.as_str()).collect()
    }
}

/// Drain the queue until the producer closes it
pub async fn collect_chunks(mut receiver: StreamReceiver) -> StreamTranscript {
    let mut transcript = StreamTranscript::default();
    while let Some(chunk) = receiver.recv().await {
        transcript.push(chunk);
    }
    transcript
}

/// View the queue as a `Stream` that ends when the producer closes it
pub fn chunk_stream(mut receiver: StreamReceiver) -> impl Stream<Item = StreamChunk> + Send {
    async_stream::stream! {
        while let Some(chunk) = receiver.recv().await {
            yield chunk;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::channel;
    use futures::StreamExt;

    #[tokio::test]
    async fn collects_until_closed() {
        let (sink, rx) = channel(2);
        let tx = sink.take().unwrap();
        let producer = tokio::spawn(async move {
            tx.send(StreamChunk::content("a")).await.unwrap();
            tx.send(StreamChunk::tool_call(ToolCall::new("c1", "f", "{}")))
                .await
                .unwrap();
            tx.send(StreamChunk::content("b")).await.unwrap();
        });
        let transcript = collect_chunks(rx).await;
        producer.await.unwrap();

        assert_eq!(transcript.content, "ab");
        assert_eq!(transcript.tool_call_ids(), vec!["c1"]);
        assert_eq!(transcript.chunks, 3);
    }

    #[tokio::test]
    async fn stream_view_ends_with_the_queue() {
        let (sink, rx) = channel(4);
        let tx = sink.take().unwrap();
        tx.send(StreamChunk::content("x")).await.unwrap();
        drop(tx);
        let chunks: Vec<_> = chunk_stream(rx).collect().await;
        assert_eq!(chunks, vec![StreamChunk::content("x")]);
    }
}
