//! Model contracts
//!
//! - `Model` - conversation in, `ContentResponse` out, optional streaming
//! - `ModelExt` - option-function and single-prompt conveniences
//! - `EmbeddingModel` - text in, vectors out

pub mod embedding;
pub mod model;

pub use embedding::*;
pub use model::*;
