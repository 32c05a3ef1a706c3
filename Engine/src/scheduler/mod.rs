//! `SeedScheduler`: the long-lived seed store with three interchangeable
//! backends (FIFO queue, priority heap, UCB1 bandit tree), dispatched
//! through a single enum handle — the Rust realization of §9's "dynamic
//! dispatch over schedulers" note, generalized from the teacher's
//! `SchedulerType` enum (`config.rs`) dispatched in `PeelFuzzer::scheduler(..)`.

pub mod heap;
pub mod queue;
pub mod ucb;

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::{Config, PriorityMode, SchedulerKind};
use crate::seed::{Seed, SeedId, SeedMetadata, SeedStats};
use crate::seed::SchedulerItem;
use crate::signals::Signals;

pub use heap::HeapScheduler;
pub use queue::FifoScheduler;
pub use ucb::UcbScheduler;

/// Uniform stats dump shape from §6: common fields plus a
/// backend-specific `extra` bag, since Rust has no natural
/// heterogeneous struct-per-variant return type that still serializes
/// uniformly (and `serde_json::Value` is already pulled in at the
/// signals boundary).
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    pub kind: &'static str,
    pub size: usize,
    pub total_leased: u64,
    pub total_updated: u64,
    pub extra: serde_json::Value,
}

/// Tracks outstanding leases by sequence number so stale `update()`
/// calls (per §5/§7) are discarded without a back-pointer from the
/// seed to its `SchedulerItem`.
#[derive(Debug, Default)]
pub(crate) struct LeaseTracker {
    next_item_id: u64,
    current_sequence: HashMap<SeedId, u64>,
    pub total_leased: u64,
    pub total_updated: u64,
}

impl LeaseTracker {
    /// Start a new lease for `id`, returning `(item_id, sequence)`.
    pub fn lease(&mut self, id: SeedId) -> (u64, u64) {
        let item_id = self.next_item_id;
        self.next_item_id += 1;
        let sequence = self.current_sequence.entry(id).or_insert(0);
        *sequence += 1;
        self.total_leased += 1;
        (item_id, *sequence)
    }

    /// Returns `true` if `(id, sequence)` is still the live lease.
    pub fn is_current(&self, id: SeedId, sequence: u64) -> bool {
        self.current_sequence.get(&id) == Some(&sequence)
    }

    pub fn current_sequence(&self, id: SeedId) -> u64 {
        self.current_sequence.get(&id).copied().unwrap_or(0)
    }

    /// Marks the lease for `id` as applied and bumps its sequence, so
    /// a second `update()` call carrying the same (now stale) item is
    /// discarded — satisfies "two consecutive updates with the same
    /// item: the second is a no-op."
    pub fn mark_updated(&mut self, id: SeedId) {
        self.total_updated += 1;
        *self.current_sequence.entry(id).or_insert(0) += 1;
    }

    pub fn forget(&mut self, id: SeedId) {
        self.current_sequence.remove(&id);
    }
}

/// The three interchangeable backends behind a common operation
/// vocabulary. The owner holds one `SeedScheduler` regardless of kind.
pub enum SeedScheduler {
    Fifo(FifoScheduler),
    Heap(HeapScheduler),
    Ucb(UcbScheduler),
}

impl SeedScheduler {
    /// Construct the backend named by `config.scheduler_kind`, seeding
    /// its RNG from `config.rng_seed` (or OS entropy if unset).
    pub fn new(config: &Config) -> Self {
        let seed = config.rng_seed.unwrap_or_else(rand::random::<u64>);
        let rng = StdRng::seed_from_u64(seed);
        match config.scheduler_kind {
            SchedulerKind::Queue => SeedScheduler::Fifo(FifoScheduler::new()),
            SchedulerKind::Heap => {
                let mode = config.priority_mode;
                SeedScheduler::Heap(HeapScheduler::new(mode, rng))
            }
            SchedulerKind::UcbTree => SeedScheduler::Ucb(UcbScheduler::new(
                config.ucb_c,
                config.max_seeds_per_leaf,
                rng,
            )),
        }
    }

    pub fn add(&mut self, seed: Seed, metadata: Option<SeedMetadata>) {
        match self {
            SeedScheduler::Fifo(s) => s.add(seed, metadata),
            SeedScheduler::Heap(s) => s.add(seed, metadata),
            SeedScheduler::Ucb(s) => s.add(seed, metadata),
        }
    }

    pub fn next(&mut self) -> Option<SchedulerItem> {
        match self {
            SeedScheduler::Fifo(s) => s.next(),
            SeedScheduler::Heap(s) => s.next(),
            SeedScheduler::Ucb(s) => s.next(),
        }
    }

    pub fn update(&mut self, item: SchedulerItem, interestingness_score: f64, signals: &Signals) {
        match self {
            SeedScheduler::Fifo(s) => s.update(item, interestingness_score, signals),
            SeedScheduler::Heap(s) => s.update(item, interestingness_score, signals),
            SeedScheduler::Ucb(s) => s.update(item, interestingness_score, signals),
        }
    }

    pub fn empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            SeedScheduler::Fifo(s) => s.len(),
            SeedScheduler::Heap(s) => s.len(),
            SeedScheduler::Ucb(s) => s.len(),
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        match self {
            SeedScheduler::Fifo(s) => s.stats(),
            SeedScheduler::Heap(s) => s.stats(),
            SeedScheduler::Ucb(s) => s.stats(),
        }
    }

    pub fn debug_dump(&self, limit: usize) -> serde_json::Value {
        match self {
            SeedScheduler::Fifo(s) => s.debug_dump(limit),
            SeedScheduler::Heap(s) => s.debug_dump(limit),
            SeedScheduler::Ucb(s) => s.debug_dump(limit),
        }
    }

    /// Per-seed bookkeeping, shared read access across backends (used
    /// by the power scheduler to pull `SeedStats` for a cycle).
    pub fn seed_stats(&self) -> Vec<SeedStats> {
        match self {
            SeedScheduler::Fifo(s) => s.seed_stats(),
            SeedScheduler::Heap(s) => s.seed_stats(),
            SeedScheduler::Ucb(s) => s.seed_stats(),
        }
    }
}
