//! Protocol adapter between two client surfaces and one upstream provider.
//!
//! Clients speak either the local-runner REST API (`/api/*`, NDJSON
//! streaming) or the OpenAI-compatible API (`/v1/*`, SSE streaming). The
//! configured upstream speaks either OpenAI-compatible completions or the
//! content-generation protocol. This crate normalizes requests for the
//! upstream, translates its streams back into the client's framing, and
//! retries rate-limited calls before any output is sent.
#![deny(unsafe_code)]

pub mod dialect;
pub mod error;
pub mod format;
pub mod models;
pub mod ollama_handlers;
pub mod ollama_models;
pub mod openai_handlers;
pub mod relay;
pub mod retry;
pub mod server;
pub mod stream;
pub mod upstream;

pub use server::{ProxyState, create_router, serve};
