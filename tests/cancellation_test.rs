//! Cancellation and deadlines while a call is streaming

mod support;

use std::sync::Arc;
use std::time::Duration;
use unillm::prelude::*;
use unillm::streaming::channel;

use support::*;

/// Upper bound for "promptly" in these tests
const PROMPT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn cancel_mid_stream_returns_cancelled_and_closes_the_queue() {
    let model = Arc::new(scripted(vec![slow_stream()]));
    let ctx = RequestContext::background();
    let (sink, mut rx) = channel(4);

    let call = {
        let model = model.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            model
                .generate(&ctx, &[ChatMessage::human("Hi")], &CallOptions::new().stream(sink))
                .await
        })
    };

    let first = rx.recv().await.unwrap();
    assert_eq!(first, StreamChunk::content("partial"));
    ctx.cancel();

    let result = tokio::time::timeout(PROMPT, call).await.unwrap().unwrap();
    assert!(matches!(result, Err(LlmError::Cancelled)));
    let closed = tokio::time::timeout(PROMPT, rx.recv()).await.unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn cancel_unblocks_a_producer_stuck_on_a_full_queue() {
    let model = Arc::new(scripted(vec![greeting()]));
    let ctx = RequestContext::background();
    // Capacity one and nobody reading: the second chunk blocks.
    let (sink, rx) = channel(1);

    let call = {
        let model = model.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            model
                .generate(&ctx, &[ChatMessage::human("Hi")], &CallOptions::new().stream(sink))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!call.is_finished());
    ctx.cancel();

    let result = tokio::time::timeout(PROMPT, call).await.unwrap().unwrap();
    assert!(result.unwrap_err().is_cancellation());
    drop(rx);
}

#[tokio::test]
async fn deadline_turns_into_a_timeout_error() {
    let model = scripted(vec![slow_stream()]);
    let ctx = RequestContext::background().with_timeout(Duration::from_millis(50));
    let messages = [ChatMessage::human("Hi")];
    let (result, transcript) = tokio::time::timeout(
        PROMPT,
        generate_streaming(&model, &ctx, &messages, CallOptions::new()),
    )
    .await
    .unwrap();

    assert!(matches!(result, Err(LlmError::Timeout(_))));
    assert_eq!(transcript.content, "partial");
}

#[tokio::test]
async fn cancelled_context_never_reaches_the_vendor() {
    let model = scripted(vec![greeting()]);
    let ctx = RequestContext::background();
    ctx.cancel();

    let err = model
        .generate(&ctx, &[ChatMessage::human("Hi")], &CallOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Cancelled));
    assert_eq!(model.remaining_turns().await, 1);
}

#[tokio::test]
async fn child_context_follows_its_parent() {
    let model = Arc::new(scripted(vec![slow_stream()]));
    let parent = RequestContext::background();
    let child = parent.child();

    let call = {
        let model = model.clone();
        tokio::spawn(async move {
            model
                .generate(&child, &[ChatMessage::human("Hi")], &CallOptions::new())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    parent.cancel();

    let result = tokio::time::timeout(PROMPT, call).await.unwrap().unwrap();
    assert!(matches!(result, Err(LlmError::Cancelled)));
}
