//! Port definitions (trait abstractions) for replaceable collaborators.
//!
//! # Design Rules
//!
//! - No HTTP or framework types in any signature
//! - Every port has a deterministic implementation usable in tests

pub mod synthetic;

pub use synthetic::{FixedMetadata, SyntheticMetadata, Timings};
