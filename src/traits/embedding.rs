use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::LlmError;
use crate::types::{EmbeddingInput, EmbeddingOptions, EmbeddingResponse};

/// Text embedding model
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed every input string, in order.
    ///
    /// Empty input (no strings, or only empty strings) fails with
    /// `EmptyInput` before any vendor call.
    async fn generate_embeddings(
        &self,
        ctx: &RequestContext,
        input: EmbeddingInput,
        options: &EmbeddingOptions,
    ) -> Result<EmbeddingResponse, LlmError>;

    /// Configured model id
    fn model_id(&self) -> &str;

    /// Output dimension, when fixed
    fn dimension(&self) -> Option<usize> {
        None
    }
}
