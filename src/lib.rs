//! # unillm - A Provider-Agnostic LLM Generation Protocol
//!
//! `unillm` defines the contract every model adapter satisfies, so callers
//! can swap vendors without touching their code.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Closed content model**: text, images, tool calls and tool results, with
//!   explicit errors for anything an adapter cannot express.
//! - **Streaming over a bounded queue**: content fragments and complete tool
//!   calls, consistent with the final response, cancellable while blocked.
//! - **Tool round trips**: unique ids, always-valid JSON arguments, one tool
//!   message per assistant turn, thought signatures resent verbatim.
//! - **Usage normalization** across every vendor naming convention.
//! - **Record/replay fixtures** so conformance suites run offline.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unillm::prelude::*;
//!
//! let model = ScriptedModel::builder("openai", "gpt-4o")
//!     .turn(vec![VendorEvent::text("Hello!")])
//!     .build()?;
//!
//! let (sink, rx) = streaming::channel(16);
//! let consumer = tokio::spawn(streaming::collect_chunks(rx));
//! let response = model
//!     .generate(
//!         &RequestContext::background(),
//!         &[ChatMessage::human("Hi")],
//!         &CallOptions::new().stream(sink),
//!     )
//!     .await?;
//! assert_eq!(consumer.await?.content, response.content());
//! ```

pub mod adapters;
pub mod conformance;
pub mod context;
pub mod error;
pub mod events;
pub mod observability;
pub mod recording;
pub mod roundtrip;
pub mod streaming;
pub mod traits;
pub mod types;

pub use context::RequestContext;
pub use error::LlmError;
pub use traits::{EmbeddingModel, Model, ModelExt};

/// Everything needed to build conversations and call models
pub mod prelude {
    pub use crate::adapters::{ScriptedEmbeddingModel, ScriptedModel, VendorEvent};
    pub use crate::context::RequestContext;
    pub use crate::error::{ErrorCategory, LlmError};
    pub use crate::events::{EventEmitter, NoopEmitter, TracingEmitter};
    pub use crate::recording::{RecordMode, Recorder, RecorderConfig};
    pub use crate::streaming::{self, StreamChunk, StreamSink, ToolCallDelta};
    pub use crate::traits::{EmbeddingModel, Model, ModelExt};
    pub use crate::types::*;
}

static_assertions::assert_impl_all!(types::CallOptions: Send, Sync, Clone);
static_assertions::assert_impl_all!(RequestContext: Send, Sync, Clone);
static_assertions::assert_impl_all!(streaming::StreamSink: Send, Sync, Clone);
static_assertions::assert_impl_all!(recording::FixtureStore: Send, Sync);
static_assertions::assert_impl_all!(adapters::ScriptedModel: Send, Sync);
static_assertions::assert_impl_all!(LlmError: Send, Sync, Clone);
