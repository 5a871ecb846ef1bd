//! Synthetic model catalog entries.

use std::fmt;

use chrono::{DateTime, Utc};

/// Quantization label reported for a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantization {
    Q4KM,
    F16,
}

impl Quantization {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Q4KM => "Q4_K_M",
            Self::F16 => "F16",
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog metadata for one model name.
///
/// The upstream exposes none of these fields; every value except `name`
/// and `family` is fabricated by a [`crate::SyntheticMetadata`] generator
/// and regenerated on every catalog read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub name: String,
    pub size_bytes: u64,
    /// 64 lowercase hex characters.
    pub digest: String,
    pub modified_at: DateTime<Utc>,
    pub family: String,
    pub parameter_size: String,
    pub quantization_level: Quantization,
}

impl ModelDescriptor {
    /// Model family guessed from the leading segment of the name.
    ///
    /// `gemini-1.5-flash` → `gemini`, `llama3.1:8b` → `llama3`.
    #[must_use]
    pub fn family_for(name: &str) -> String {
        let base = name.rsplit('/').next().unwrap_or(name);
        let family: String = base
            .split(['-', ':', '.', '_'])
            .next()
            .unwrap_or(base)
            .to_ascii_lowercase();
        if family.is_empty() {
            "unknown".to_string()
        } else {
            family
        }
    }
}
