//! Core domain types.
//!
//! These types represent the pure domain model, independent of any wire
//! protocol or HTTP framework.
//!
//! # Structure
//!
//! - `style` - Upstream style and surface protocol classification
//! - `request` - Generic chat, completion and embedding request records
//! - `frame` - Internal stream frame produced per upstream delta
//! - `model` - Synthetic model catalog descriptor

pub mod frame;
pub mod model;
pub mod request;
pub mod style;

pub use frame::{FinishReason, StreamFrame};
pub use model::{ModelDescriptor, Quantization};
pub use request::{
    ChatMessage, ChatRequest, CompletionRequest, EmbeddingInput, EmbeddingRequest, MessageContent,
    MessageRole,
};
pub use style::{CallKind, SurfaceProtocol, UpstreamStyle};
