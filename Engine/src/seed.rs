//! Seed identity, the immutable seed record, and per-seed bookkeeping.

use std::collections::hash_map::DefaultHasher;
use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

/// Fixed seeds so `digest_coverage_bitmap` is pure across processes,
/// not just within one (ahash's `Default` reseeds per-process).
const DIGEST_SEEDS: (u64, u64, u64, u64) = (0x5ee1_c0de, 0xf00d_cafe, 0x1234_5678, 0x9abc_def0);

/// Stable, dense seed identifier assigned by the corpus loader (or by
/// the scheduler itself for seeds synthesized from interesting
/// mutations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeedId(pub u64);

/// Corpus bucket label, e.g. `valid`, `string_stress`, `near_valid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bucket(pub String);

impl Bucket {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }
}

/// Parent lineage and any coverage hints carried from the producing
/// mutation, attached to a derived seed at creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedMetadata {
    pub parent: Option<SeedId>,
    pub coverage_hint: Option<Vec<u32>>,
    /// The signals that made this seed interesting, if any — consumed
    /// by the UCB backend for initial bucket placement on `add()`.
    pub signals: Option<crate::signals::Signals>,
}

/// An immutable input unit. Never mutated after creation — a new
/// interesting mutation becomes a new `Seed` with its own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub id: SeedId,
    pub payload: Vec<u8>,
    pub bucket: Bucket,
    pub family: String,
    pub metadata: SeedMetadata,
}

impl Seed {
    pub fn new(id: SeedId, payload: Vec<u8>, bucket: Bucket, family: impl Into<String>) -> Self {
        Self {
            id,
            payload,
            bucket,
            family: family.into(),
            metadata: SeedMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: SeedMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Lossy UTF-8 view of the payload, for debug printing only.
    pub fn payload_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Per-seed mutable bookkeeping, owned by the `SeedScheduler` and
/// mutated on every `update()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedStats {
    pub id: SeedId,
    pub avg_exec_time_ms: Option<f64>,
    pub coverage_bitmap: Option<Vec<u32>>,
    pub fuzz_count: u64,
}

impl SeedStats {
    pub fn new(id: SeedId) -> Self {
        Self {
            id,
            avg_exec_time_ms: None,
            coverage_bitmap: None,
            fuzz_count: 0,
        }
    }

    /// Fold a fresh execution-time sample into the running average.
    pub fn record_exec_time(&mut self, sample_ms: f64) {
        self.avg_exec_time_ms = Some(match self.avg_exec_time_ms {
            Some(prev) => {
                let n = self.fuzz_count.max(1) as f64;
                (prev * n + sample_ms) / (n + 1.0)
            }
            None => sample_ms,
        });
    }
}

impl Default for SeedId {
    fn default() -> Self {
        SeedId(0)
    }
}

/// Opaque-to-the-caller scheduler state needed to apply an `update()`,
/// one variant per backend. Never constructed outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LeasePath {
    Fifo,
    Heap,
    Ucb { node_path: Vec<u64> },
}

/// A handle returned by `next()` and consumed by `update()`.
#[derive(Debug, Clone)]
pub struct SchedulerItem {
    pub item_id: u64,
    pub seed: Seed,
    pub(crate) path: LeasePath,
    pub sequence: u64,
}

/// A stable digest of a coverage bitmap, used as the default
/// `coverage_key` when no explicit key is provided.
pub fn digest_coverage_bitmap(bitmap: &[u32]) -> String {
    let (k0, k1, k2, k3) = DIGEST_SEEDS;
    let mut hasher = RandomState::with_seeds(k0, k1, k2, k3).build_hasher();
    bitmap.hash(&mut hasher);
    format!("cov:{:016x}", hasher.finish())
}

/// A stable digest used when deriving a bug key from free-form text
/// (e.g. an exception message) rather than an explicit key.
pub fn digest_text(text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_digest_is_pure() {
        let bitmap = vec![1, 0, 3, 0, 5];
        assert_eq!(digest_coverage_bitmap(&bitmap), digest_coverage_bitmap(&bitmap));
    }

    #[test]
    fn exec_time_average_folds_samples() {
        let mut stats = SeedStats::new(SeedId(1));
        stats.record_exec_time(10.0);
        stats.fuzz_count = 1;
        stats.record_exec_time(20.0);
        assert_eq!(stats.avg_exec_time_ms, Some(15.0));
    }
}
