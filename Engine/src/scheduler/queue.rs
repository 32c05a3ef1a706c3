//! Cyclic FIFO backend: `next()` rotates the head to the tail after
//! leasing, so every seed is visited before any is revisited.

use std::collections::{HashMap, VecDeque};

use crate::scheduler::{LeaseTracker, SchedulerStats};
use crate::seed::{LeasePath, Seed, SeedId, SeedMetadata, SeedStats};
use crate::seed::SchedulerItem;
use crate::signals::Signals;

pub struct FifoScheduler {
    order: VecDeque<SeedId>,
    seeds: HashMap<SeedId, Seed>,
    stats: HashMap<SeedId, SeedStats>,
    leases: LeaseTracker,
}

impl FifoScheduler {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            seeds: HashMap::new(),
            stats: HashMap::new(),
            leases: LeaseTracker::default(),
        }
    }

    pub fn add(&mut self, seed: Seed, _metadata: Option<SeedMetadata>) {
        let id = seed.id;
        if self.seeds.contains_key(&id) {
            // Idempotent: second add of a known id is a no-op.
            return;
        }
        self.stats.insert(id, SeedStats::new(id));
        self.seeds.insert(id, seed);
        self.order.push_back(id);
    }

    pub fn next(&mut self) -> Option<SchedulerItem> {
        let id = self.order.pop_front()?;
        self.order.push_back(id);
        let seed = self.seeds.get(&id).cloned()?;
        let (item_id, sequence) = self.leases.lease(id);
        Some(SchedulerItem {
            item_id,
            seed,
            path: LeasePath::Fifo,
            sequence,
        })
    }

    pub fn update(&mut self, item: SchedulerItem, interestingness_score: f64, signals: &Signals) {
        let id = item.seed.id;
        if !self.leases.is_current(id, item.sequence) {
            crate::error::SchedulerWarning::StaleLease {
                item_id: item.item_id,
                expected_seq: self.leases.current_sequence(id),
                got_seq: item.sequence,
            }
            .log();
            return;
        }
        if let Some(stats) = self.stats.get_mut(&id) {
            stats.fuzz_count += 1;
            if let Some(bitmap) = &signals.coverage_bitmap {
                stats.coverage_bitmap = Some(bitmap.clone());
            }
            let _ = interestingness_score; // recorded for parity; FIFO never reorders on it.
        }
        self.leases.mark_updated(id);
    }

    pub fn empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            kind: "queue",
            size: self.order.len(),
            total_leased: self.leases.total_leased,
            total_updated: self.leases.total_updated,
            extra: serde_json::json!({}),
        }
    }

    pub fn debug_dump(&self, limit: usize) -> serde_json::Value {
        let items: Vec<_> = self
            .order
            .iter()
            .take(limit)
            .map(|id| {
                serde_json::json!({
                    "id": id.0,
                    "fuzz_count": self.stats.get(id).map(|s| s.fuzz_count).unwrap_or(0),
                })
            })
            .collect();
        serde_json::json!({ "kind": "queue", "order": items })
    }

    pub fn seed_stats(&self) -> Vec<SeedStats> {
        self.stats.values().cloned().collect()
    }
}

impl Default for FifoScheduler {
    fn default() -> Self {
        Self::new()
    }
}
