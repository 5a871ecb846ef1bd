//! Synthetic metadata port.
//!
//! Local-runner and OpenAI-compatible clients expect timing counters,
//! usage numbers, digests and ids that the upstream never returns. All of
//! them come from one generator so tests can swap in a deterministic one.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{ModelDescriptor, Quantization};

/// Fabricated latency and token counters for one response.
///
/// Durations are nanoseconds. `total_duration` always equals
/// `load_duration + prompt_eval_duration + eval_duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub total_duration: u64,
    pub load_duration: u64,
    pub prompt_eval_count: u32,
    pub prompt_eval_duration: u64,
    pub eval_count: u32,
    pub eval_duration: u64,
}

impl Timings {
    /// Split a total duration into load / prompt / eval phases.
    #[must_use]
    pub const fn split(total_duration: u64, prompt_eval_count: u32, eval_count: u32) -> Self {
        let load_duration = total_duration / 50;
        let prompt_eval_duration = total_duration / 5;
        let eval_duration = total_duration - load_duration - prompt_eval_duration;
        Self {
            total_duration,
            load_duration,
            prompt_eval_count,
            prompt_eval_duration,
            eval_count,
            eval_duration,
        }
    }

    /// `prompt_tokens + completion_tokens` for OpenAI-style usage blocks.
    #[must_use]
    pub const fn total_tokens(&self) -> u32 {
        self.prompt_eval_count.saturating_add(self.eval_count)
    }
}

/// Generator for every fabricated field.
pub trait SyntheticMetadata: Send + Sync + fmt::Debug {
    /// Counters for one finished generation.
    fn timings(&self) -> Timings;

    /// A fresh catalog descriptor for `name`.
    fn descriptor(&self, name: &str) -> ModelDescriptor;

    /// Identifier for an OpenAI-style completion object.
    fn completion_id(&self) -> String;

    /// Timestamp stamped on emitted frames.
    fn now(&self) -> DateTime<Utc>;
}

/// Deterministic generator for tests and reproducible output.
#[derive(Debug, Clone, Default)]
pub struct FixedMetadata;

impl FixedMetadata {
    /// Fixed timestamp: 2024-01-01T00:00:00Z.
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }
}

impl SyntheticMetadata for FixedMetadata {
    fn timings(&self) -> Timings {
        Timings::split(2_000_000_000, 12, 34)
    }

    fn descriptor(&self, name: &str) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            size_bytes: 100_000_000,
            digest: "0".repeat(64),
            modified_at: Self::epoch(),
            family: ModelDescriptor::family_for(name),
            parameter_size: "7B".to_string(),
            quantization_level: Quantization::Q4KM,
        }
    }

    fn completion_id(&self) -> String {
        "chatcmpl-fixed".to_string()
    }

    fn now(&self) -> DateTime<Utc> {
        Self::epoch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_internally_consistent() {
        let t = Timings::split(3_000_000_007, 5, 9);
        assert_eq!(
            t.total_duration,
            t.load_duration + t.prompt_eval_duration + t.eval_duration
        );
        assert_eq!(t.total_tokens(), 14);
    }

    #[test]
    fn fixed_metadata_is_stable() {
        let meta = FixedMetadata;
        assert_eq!(meta.timings(), meta.timings());
        assert_eq!(meta.descriptor("m"), meta.descriptor("m"));
        assert_eq!(meta.now().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
