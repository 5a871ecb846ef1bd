//! Randomized synthetic metadata used in production.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::domain::{ModelDescriptor, Quantization};
use crate::ports::{SyntheticMetadata, Timings};

const HEX: &[u8; 16] = b"0123456789abcdef";
const PARAMETER_SIZES: [&str; 6] = ["3B", "7B", "8B", "13B", "34B", "70B"];

/// Plausible random values; regenerated on every call and never cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMetadata;

impl SyntheticMetadata for RandomMetadata {
    fn timings(&self) -> Timings {
        let mut rng = rand::rng();
        let total = rng.random_range(1_000_000_000..5_000_000_000_u64);
        let prompt_eval_count = rng.random_range(10..200);
        let eval_count = rng.random_range(20..500);
        Timings::split(total, prompt_eval_count, eval_count)
    }

    fn descriptor(&self, name: &str) -> ModelDescriptor {
        let mut rng = rand::rng();
        let digest: String = (0..64)
            .map(|_| char::from(HEX[rng.random_range(0..HEX.len())]))
            .collect();
        let quantization_level = if rng.random_bool(0.5) {
            Quantization::Q4KM
        } else {
            Quantization::F16
        };

        ModelDescriptor {
            name: name.to_string(),
            size_bytes: rng.random_range(100_000_000..600_000_000),
            digest,
            modified_at: Utc::now() + Duration::days(365),
            family: ModelDescriptor::family_for(name),
            parameter_size: PARAMETER_SIZES[rng.random_range(0..PARAMETER_SIZES.len())]
                .to_string(),
            quantization_level,
        }
    }

    fn completion_id(&self) -> String {
        format!("chatcmpl-{}", Uuid::new_v4().simple())
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_fields_stay_in_range() {
        let meta = RandomMetadata;
        for _ in 0..32 {
            let d = meta.descriptor("llama3:8b");
            assert!((100_000_000..600_000_000).contains(&d.size_bytes));
            assert_eq!(d.digest.len(), 64);
            assert!(d.digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            assert!(d.modified_at > Utc::now());
            assert_eq!(d.family, "llama3");
            assert!(matches!(d.quantization_level, Quantization::Q4KM | Quantization::F16));
        }
    }

    #[test]
    fn timings_are_plausible() {
        let t = RandomMetadata.timings();
        assert!(t.total_duration >= 1_000_000_000);
        assert_eq!(
            t.total_duration,
            t.load_duration + t.prompt_eval_duration + t.eval_duration
        );
    }

    #[test]
    fn completion_ids_are_unique() {
        let meta = RandomMetadata;
        let a = meta.completion_id();
        assert!(a.starts_with("chatcmpl-"));
        assert_ne!(a, meta.completion_id());
    }
}
