//! Core Data Type Definitions
//!
//! Everything a caller or adapter exchanges through the unified contract.
//! The public API is surfaced from this root module.
//!
//! ## Module Organization
//!
//! - **`content`** - The closed `ContentPart` set and tool calls
//! - **`message`** - Chat messages and roles
//! - **`tools`** - Tool definitions, parameter schemas, tool choice
//! - **`options`** - `CallOptions` and composable option functions
//! - **`response`** - `ContentResponse` / `ContentChoice`
//! - **`usage`** - `GenerationInfo`, `Usage` and the normalizer
//! - **`embedding`** - Embedding request/response types

pub mod content;
pub mod embedding;
pub mod message;
pub mod options;
pub mod response;
pub mod tools;
pub mod usage;

pub use content::*;
pub use embedding::*;
pub use message::*;
pub use options::*;
pub use response::*;
pub use tools::*;
pub use usage::*;
