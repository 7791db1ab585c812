//! Scripted Adapter
//!
//! A vendor stand-in that replays a transcript of vendor stream events. It
//! carries out every adapter obligation against that transcript, which makes
//! it the reference implementation the conformance suites run against and a
//! test double for code built on [`Model`].
//!
//! The transcript for each call is what the recorder captures and replays,
//! so a scripted run recorded once replays byte-identically.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::context::RequestContext;
use crate::error::LlmError;
use crate::events::{EventContext, EventEmitter, NoopEmitter, SharedEmitter};
use crate::recording::{canonical_json, request_content};
use crate::roundtrip::validate_history;
use crate::streaming::{StreamEmitter, StreamSink, ToolCallAccumulator, ToolCallDelta};
use crate::traits::{EmbeddingModel, Model};
use crate::types::{
    CallOptions, ChatMessage, ContentChoice, ContentPart, ContentResponse, EmbeddingInput,
    EmbeddingOptions, EmbeddingResponse, GenerationInfo, ToolCall, Usage,
    validate_embedding_input,
};

/// One event of a vendor's streamed response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VendorEvent {
    /// Content fragment
    TextDelta { text: String },
    /// Reasoning fragment, kept out of the content stream
    ReasoningDelta { text: String },
    /// Tool call fragment
    ToolCallDelta(ToolCallDelta),
    /// The vendor finished the tool call at `index`
    ToolCallDone { index: usize },
    /// Raw usage metadata
    Usage { info: GenerationInfo },
    /// Vendor stop reason
    Stop { reason: String },
    /// Vendor error; as the first event it fails the request itself
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        message: String,
    },
    /// Vendor-side latency
    Pause { millis: u64 },
}

impl VendorEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self::ToolCallDelta(delta)
    }

    pub fn usage(info: GenerationInfo) -> Self {
        Self::Usage { info }
    }

    pub fn stop(reason: impl Into<String>) -> Self {
        Self::Stop {
            reason: reason.into(),
        }
    }

    pub fn error(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Error {
            status,
            message: message.into(),
        }
    }

    pub fn pause(duration: Duration) -> Self {
        Self::Pause {
            millis: duration.as_millis() as u64,
        }
    }
}

/// Builder for [`ScriptedModel`]
pub struct ScriptedModelBuilder {
    provider: String,
    model_id: String,
    turns: VecDeque<Vec<VendorEvent>>,
    supports_images: bool,
    emitter: SharedEmitter,
}

impl ScriptedModelBuilder {
    /// Queue the vendor transcript for the next call
    pub fn turn(mut self, events: Vec<VendorEvent>) -> Self {
        self.turns.push_back(events);
        self
    }

    /// Reject image parts, like a text-only backend
    pub fn text_only(mut self) -> Self {
        self.supports_images = false;
        self
    }

    pub fn emitter(mut self, emitter: SharedEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn build(self) -> Result<ScriptedModel, LlmError> {
        let events = self.emitter.clone();
        let ctx = EventContext::new(&self.provider, &self.model_id);
        events.init_start(ctx);

        let invalid = if self.provider.trim().is_empty() {
            Some("provider name cannot be empty")
        } else if self.model_id.trim().is_empty() {
            Some("model id cannot be empty")
        } else {
            None
        };
        if let Some(reason) = invalid {
            let err = LlmError::ConfigurationError(reason.to_string());
            events.init_error(ctx, &err);
            return Err(err);
        }
        events.init_success(ctx);

        Ok(ScriptedModel {
            provider: self.provider,
            model_id: self.model_id,
            turns: Mutex::new(self.turns),
            supports_images: self.supports_images,
            emitter: self.emitter,
            live_calls: AtomicUsize::new(0),
        })
    }
}

/// Adapter serving calls from queued vendor transcripts
pub struct ScriptedModel {
    provider: String,
    model_id: String,
    turns: Mutex<VecDeque<Vec<VendorEvent>>>,
    supports_images: bool,
    emitter: SharedEmitter,
    live_calls: AtomicUsize,
}

impl std::fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("supports_images", &self.supports_images)
            .field("live_calls", &self.live_calls())
            .finish()
    }
}

impl ScriptedModel {
    pub fn builder(provider: impl Into<String>, model_id: impl Into<String>) -> ScriptedModelBuilder {
        ScriptedModelBuilder {
            provider: provider.into(),
            model_id: model_id.into(),
            turns: VecDeque::new(),
            supports_images: true,
            emitter: Arc::new(NoopEmitter),
        }
    }

    /// Number of calls that reached the "vendor"
    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    /// Transcripts not yet consumed
    pub async fn remaining_turns(&self) -> usize {
        self.turns.lock().await.len()
    }

    async fn live_call(&self, model_id: &str) -> Result<Vec<VendorEvent>, LlmError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        let turn = self.turns.lock().await.pop_front();
        let Some(events) = turn else {
            return Err(LlmError::ProviderError {
                provider: self.provider.clone(),
                message: format!("no scripted response left for model `{model_id}`"),
                error_code: Some("script_exhausted".to_string()),
            });
        };
        // A leading error is a failed request, not a failed stream.
        if let Some(VendorEvent::Error { status, message }) = events.first() {
            return Err(vendor_error(&self.provider, *status, message.clone()));
        }
        Ok(events)
    }

    fn check_parts(&self, messages: &[ChatMessage]) -> Result<(), LlmError> {
        if self.supports_images {
            return Ok(());
        }
        for (i, message) in messages.iter().enumerate() {
            if let Some(part) = message
                .parts
                .iter()
                .find(|p| matches!(p, ContentPart::Image { .. }))
            {
                return Err(LlmError::unsupported_part(
                    part.kind(),
                    format!("message {i}: model `{}` accepts text only", self.model_id),
                ));
            }
        }
        Ok(())
    }

    async fn drive(
        &self,
        ctx: &RequestContext,
        messages: &[ChatMessage],
        options: &CallOptions,
        model_id: &str,
        stream: &mut StreamEmitter,
    ) -> Result<ContentResponse, LlmError> {
        options.validate()?;
        self.check_parts(messages)?;
        validate_history(messages)?;

        let content = request_content(messages, options);
        let events = match ctx.recorder() {
            Some(recorder) => {
                recorder
                    .intercept_typed(&self.provider, model_id, &content, || self.live_call(model_id))
                    .await?
            }
            None => self.live_call(model_id).await?,
        };
        let seed = id_seed(&content, &events)?;
        self.process(ctx, model_id, events, ToolCallAccumulator::with_seed(seed), stream)
            .await
    }

    async fn process(
        &self,
        ctx: &RequestContext,
        model_id: &str,
        events: Vec<VendorEvent>,
        mut accumulator: ToolCallAccumulator,
        stream: &mut StreamEmitter,
    ) -> Result<ContentResponse, LlmError> {
        let event_ctx = EventContext::new(&self.provider, model_id);
        let mut reasoning = String::new();
        let mut stop_reason = None;
        let mut generation_info = None;

        for event in events {
            ctx.check()?;
            match event {
                VendorEvent::TextDelta { text } => stream.emit_content(text).await?,
                VendorEvent::ReasoningDelta { text } => reasoning.push_str(&text),
                VendorEvent::ToolCallDelta(delta) => {
                    if let Some(call) = accumulator.push(delta) {
                        self.release(event_ctx, call, stream).await?;
                    }
                }
                VendorEvent::ToolCallDone { index } => {
                    if let Some(call) = accumulator.complete(index) {
                        self.release(event_ctx, call, stream).await?;
                    }
                }
                VendorEvent::Usage { info } => generation_info = Some(info),
                VendorEvent::Stop { reason } => stop_reason = Some(reason),
                VendorEvent::Error { status, message } => {
                    return Err(vendor_error(&self.provider, status, message));
                }
                VendorEvent::Pause { millis } => {
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                }
            }
        }
        for call in accumulator.finish() {
            self.release(event_ctx, call, stream).await?;
        }

        let choice = ContentChoice {
            content: stream.content().to_string(),
            stop_reason,
            reasoning_content: (!reasoning.is_empty()).then_some(reasoning),
            tool_calls: accumulator.tool_calls(),
            generation_info,
        };
        Ok(ContentResponse::single(choice))
    }

    async fn release(
        &self,
        event_ctx: EventContext<'_>,
        call: ToolCall,
        stream: &mut StreamEmitter,
    ) -> Result<(), LlmError> {
        self.emitter.tool_call_detected(event_ctx, &call);
        stream.emit_tool_call(call).await
    }
}

#[async_trait]
impl Model for ScriptedModel {
    async fn generate(
        &self,
        ctx: &RequestContext,
        messages: &[ChatMessage],
        options: &CallOptions,
    ) -> Result<ContentResponse, LlmError> {
        let model_id = options.model.as_deref().unwrap_or(&self.model_id);
        let span = tracing::debug_span!(
            "generate",
            provider = %self.provider,
            model = %model_id,
            streaming = options.is_streaming()
        );
        let sender = options.stream.as_ref().and_then(StreamSink::take);
        let mut stream = StreamEmitter::new(sender, ctx.cancellation_token());

        let result = ctx
            .run(self.drive(ctx, messages, options, model_id, &mut stream))
            .instrument(span)
            .await;

        let event_ctx = EventContext::new(&self.provider, model_id);
        match &result {
            Ok(response) => {
                stream.complete();
                self.emitter.generation_success(event_ctx, response);
            }
            Err(e) => {
                stream.fail();
                tracing::debug!(provider = %self.provider, model = %model_id, error = %e, "generation failed");
                self.emitter.generation_error(event_ctx, e);
            }
        }
        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        &self.provider
    }
}

fn vendor_error(provider: &str, status: Option<u16>, message: String) -> LlmError {
    match status {
        Some(code) => LlmError::ApiError {
            code,
            message,
            details: None,
        },
        None => LlmError::ProviderError {
            provider: provider.to_string(),
            message,
            error_code: None,
        },
    }
}

/// Embedding model producing deterministic unit vectors from text hashes
#[derive(Debug, Clone)]
pub struct ScriptedEmbeddingModel {
    model_id: String,
    dimension: usize,
}

impl ScriptedEmbeddingModel {
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Result<Self, LlmError> {
        let model_id = model_id.into();
        if model_id.trim().is_empty() {
            return Err(LlmError::ConfigurationError(
                "model id cannot be empty".to_string(),
            ));
        }
        if dimension == 0 {
            return Err(LlmError::ConfigurationError(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            model_id,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingModel for ScriptedEmbeddingModel {
    async fn generate_embeddings(
        &self,
        ctx: &RequestContext,
        input: EmbeddingInput,
        options: &EmbeddingOptions,
    ) -> Result<EmbeddingResponse, LlmError> {
        ctx.check()?;
        validate_embedding_input(&input)?;
        let dimension = match options.dimensions {
            Some(0) => {
                return Err(LlmError::InvalidParameter(
                    "dimensions must be positive".to_string(),
                ));
            }
            Some(d) => (d as usize).min(self.dimension),
            None => self.dimension,
        };

        let texts = input.into_texts();
        let tokens: u64 = texts.iter().map(|t| t.split_whitespace().count() as u64).sum();
        let embeddings = texts.iter().map(|t| hash_vector(t, dimension)).collect();
        Ok(EmbeddingResponse {
            embeddings,
            model: options.model.clone().unwrap_or_else(|| self.model_id.clone()),
            usage: Some(Usage::new(tokens, 0)),
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}


/// Seed for generated tool-call ids. Same request and transcript, same ids.
fn id_seed(content: &serde_json::Value, events: &[VendorEvent]) -> Result<String, LlmError> {
    let transcript = serde_json::json!({
        "request": content,
        "events": serde_json::to_value(events)?,
    });
    Ok(format!("{:x}", Sha256::digest(canonical_json(&transcript).as_bytes())))
}

fn hash_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut values = Vec::with_capacity(dimension);
    let mut block = Sha256::digest(text.as_bytes());
    while values.len() < dimension {
        for pair in block.chunks_exact(2) {
            if values.len() == dimension {
                break;
            }
            let raw = u16::from_le_bytes([pair[0], pair[1]]);
            values.push(raw as f32 / u16::MAX as f32 * 2.0 - 1.0);
        }
        block = Sha256::digest(block);
    }
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter_mut().for_each(|v| *v /= norm);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::{channel, collect_chunks};

    fn greeting() -> Vec<VendorEvent> {
        vec![
            VendorEvent::text("Hello"),
            VendorEvent::text(", world!"),
            VendorEvent::stop("end_turn"),
        ]
    }

    #[tokio::test]
    async fn builds_response_from_transcript() {
        let model = ScriptedModel::builder("openai", "gpt-4o")
            .turn(greeting())
            .build()
            .unwrap();
        let response = model
            .generate(
                &RequestContext::background(),
                &[ChatMessage::human("hi")],
                &CallOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(response.content(), "Hello, world!");
        assert_eq!(response.first().unwrap().stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(model.live_calls(), 1);
    }

    #[tokio::test]
    async fn stream_matches_final_content() {
        let model = ScriptedModel::builder("openai", "gpt-4o")
            .turn(greeting())
            .build()
            .unwrap();
        let (sink, rx) = channel(1);
        let consumer = tokio::spawn(collect_chunks(rx));
        let response = model
            .generate(
                &RequestContext::background(),
                &[ChatMessage::human("hi")],
                &CallOptions::new().stream(sink),
            )
            .await
            .unwrap();
        let transcript = consumer.await.unwrap();
        assert_eq!(transcript.content, response.content());
        assert_eq!(transcript.chunks, 2);
    }

    #[tokio::test]
    async fn leading_error_fails_the_request() {
        let model = ScriptedModel::builder("anthropic", "claude")
            .turn(vec![VendorEvent::error(Some(529), "overloaded")])
            .build()
            .unwrap();
        let err = model
            .generate(
                &RequestContext::background(),
                &[ChatMessage::human("hi")],
                &CallOptions::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(529));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn text_only_model_rejects_images() {
        let model = ScriptedModel::builder("openai", "gpt-3.5-turbo")
            .text_only()
            .turn(greeting())
            .build()
            .unwrap();
        let message = ChatMessage::human("what is this?").with_image_url("https://example.com/cat.png");
        let err = model
            .generate(&RequestContext::background(), &[message], &CallOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedContentPart { ref kind, .. } if kind == "image"));
        assert_eq!(model.live_calls(), 0);
    }

    #[test]
    fn empty_model_id_is_a_configuration_error() {
        let err = ScriptedModel::builder("openai", " ").build().unwrap_err();
        assert!(matches!(err, LlmError::ConfigurationError(_)));
    }

    #[test]
    fn vendor_events_have_a_stable_wire_shape() {
        let event = VendorEvent::tool_call(ToolCallDelta::at(0).id("c1").name("f"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"event": "tool_call_delta", "index": 0, "id": "c1", "name": "f"})
        );
        let back: VendorEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[tokio::test]
    async fn embeddings_are_deterministic_unit_vectors() {
        let model = ScriptedEmbeddingModel::new("embed-small", 16).unwrap();
        let ctx = RequestContext::background();
        let input = EmbeddingInput::from(vec!["alpha beta".to_string(), "gamma".to_string()]);
        let first = model
            .generate_embeddings(&ctx, input.clone(), &EmbeddingOptions::default())
            .await
            .unwrap();
        let second = model
            .generate_embeddings(&ctx, input, &EmbeddingOptions::default())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.embeddings.len(), 2);
        assert_eq!(first.embeddings[0].len(), 16);
        let norm: f32 = first.embeddings[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert_eq!(first.usage.unwrap().input_tokens, 3);
    }

    #[tokio::test]
    async fn empty_embedding_input_is_rejected() {
        let model = ScriptedEmbeddingModel::new("embed-small", 8).unwrap();
        let err = model
            .generate_embeddings(
                &RequestContext::background(),
                EmbeddingInput::from(vec![String::new(), String::new()]),
                &EmbeddingOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyInput(_)));
    }
}
