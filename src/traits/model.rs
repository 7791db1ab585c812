use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::LlmError;
use crate::types::{CallOption, CallOptions, ChatMessage, ContentResponse};

/// A text-generation model behind some vendor API.
///
/// Implementations must:
/// - reject content parts they cannot express with `UnsupportedContentPart`
/// - push chunks to `options.stream` (when set) so the concatenated content
///   equals the returned content and every returned tool call is streamed
///   exactly once, complete
/// - close the stream on success, failure and cancellation alike
/// - route the vendor call through `ctx.recorder()` when one is attached
/// - never retry
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate a response for `messages`
    async fn generate(
        &self,
        ctx: &RequestContext,
        messages: &[ChatMessage],
        options: &CallOptions,
    ) -> Result<ContentResponse, LlmError>;

    /// Configured model id
    fn model_id(&self) -> &str;

    /// Provider name, used for fixture layout and events
    fn provider(&self) -> &str {
        "custom"
    }
}

/// Conveniences over any [`Model`]
#[async_trait]
pub trait ModelExt: Model {
    /// Generate with composable option functions
    async fn generate_with(
        &self,
        ctx: &RequestContext,
        messages: &[ChatMessage],
        options: &[CallOption],
    ) -> Result<ContentResponse, LlmError> {
        let options = CallOptions::from_options(options);
        self.generate(ctx, messages, &options).await
    }

    /// Single human prompt in, first choice's content out
    async fn call(
        &self,
        ctx: &RequestContext,
        prompt: &str,
        options: &[CallOption],
    ) -> Result<String, LlmError> {
        let messages = [ChatMessage::human(prompt)];
        let response = self.generate_with(ctx, &messages, options).await?;
        let choice = response
            .first()
            .ok_or_else(|| LlmError::ParseError("response has no choices".to_string()))?;
        Ok(choice.content.clone())
    }
}

impl<T: Model + ?Sized> ModelExt for T {}
