//! Model Adapters
//!
//! Implementations of the model contracts. Every adapter owns the
//! translation between the unified types and one vendor's wire format; the
//! obligations they share (streaming, tool-call accumulation, argument
//! sanitization, recorder interception, lifecycle events, usage metadata)
//! are implemented once in the `streaming`, `roundtrip` and `recording`
//! modules and reused here.
//!
//! - `scripted` - deterministic, network-free adapter driven by a recorded
//!   or hand-written vendor event transcript

pub mod scripted;

pub use scripted::*;
