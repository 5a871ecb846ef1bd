//! Core domain types and port definitions for relaylm.
//!
//! This crate holds everything that does not touch HTTP: the request and
//! frame types shared by every surface, the immutable process configuration,
//! model-name resolution, upstream style classification, and the synthetic
//! metadata port used to fabricate fields the upstream never supplies.

pub mod config;
pub mod domain;
pub mod error;
pub mod metadata;
pub mod ports;
pub mod resolver;

pub use config::{ConfigError, RelayConfig, RelayConfigBuilder, RetryPolicy};
pub use domain::{
    CallKind, ChatMessage, ChatRequest, CompletionRequest, EmbeddingInput, EmbeddingRequest,
    FinishReason, MessageContent, MessageRole, ModelDescriptor, Quantization, StreamFrame,
    SurfaceProtocol, UpstreamStyle,
};
pub use error::{RelayError, RelayResult};
pub use metadata::RandomMetadata;
pub use ports::{FixedMetadata, SyntheticMetadata, Timings};
pub use resolver::ModelResolver;
