//! Priority heap backend: pop the max-priority seed, reinsert it with
//! a decayed priority so it is revisited but deprioritized, per §4.4.2.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use rand::rngs::StdRng;

use crate::config::PriorityMode;
use crate::scheduler::{LeaseTracker, SchedulerStats};
use crate::seed::{LeasePath, Seed, SeedId, SeedMetadata, SeedStats};
use crate::seed::SchedulerItem;
use crate::signals::Signals;

/// Decay factor applied to a seed's priority every time it is leased.
const DECAY_GAMMA: f64 = 0.9;

#[derive(Debug, Clone)]
struct HeapEntry {
    priority: f64,
    insertion_order: u64,
    id: SeedId,
    version: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.id == other.id
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on priority; older insertion wins ties (FIFO under
        // equal priority), so it must compare as *greater* to surface first.
        self.priority
            .partial_cmp(&other.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.insertion_order.cmp(&self.insertion_order))
    }
}

struct PriorityBookkeeping {
    priority: f64,
    score_sum: f64,
    score_count: u64,
}

pub struct HeapScheduler {
    heap: BinaryHeap<HeapEntry>,
    seeds: HashMap<SeedId, Seed>,
    stats: HashMap<SeedId, SeedStats>,
    priorities: HashMap<SeedId, PriorityBookkeeping>,
    /// Current version per seed id. A popped `HeapEntry` whose version
    /// doesn't match is a stale duplicate left behind by a later
    /// `next()`/`update()` push and is discarded instead of leased.
    versions: HashMap<SeedId, u64>,
    leases: LeaseTracker,
    mode: PriorityMode,
    insertion_counter: u64,
    #[allow(dead_code)]
    rng: StdRng,
}

impl HeapScheduler {
    pub fn new(mode: PriorityMode, rng: StdRng) -> Self {
        Self {
            heap: BinaryHeap::new(),
            seeds: HashMap::new(),
            stats: HashMap::new(),
            priorities: HashMap::new(),
            versions: HashMap::new(),
            leases: LeaseTracker::default(),
            mode,
            insertion_counter: 0,
            rng,
        }
    }

    /// Bump and return the current version for `id`, superseding any
    /// previously pushed entry for the same seed.
    fn bump_version(&mut self, id: SeedId) -> u64 {
        let version = self.versions.entry(id).or_insert(0);
        *version += 1;
        *version
    }

    fn default_priority(&self) -> f64 {
        if self.priorities.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.priorities.values().map(|p| p.priority).sum();
        sum / self.priorities.len() as f64
    }

    pub fn add(&mut self, seed: Seed, _metadata: Option<SeedMetadata>) {
        let id = seed.id;
        if self.seeds.contains_key(&id) {
            return;
        }
        let priority = self.default_priority();
        self.stats.insert(id, SeedStats::new(id));
        self.seeds.insert(id, seed);
        self.priorities.insert(
            id,
            PriorityBookkeeping {
                priority,
                score_sum: 0.0,
                score_count: 0,
            },
        );
        self.insertion_counter += 1;
        let version = self.bump_version(id);
        self.heap.push(HeapEntry {
            priority,
            insertion_order: self.insertion_counter,
            id,
            version,
        });
    }

    pub fn next(&mut self) -> Option<SchedulerItem> {
        let (id, priority) = loop {
            let entry = self.heap.pop()?;
            if self.versions.get(&entry.id) == Some(&entry.version) {
                break (entry.id, entry.priority);
            }
            // Superseded by a later push for the same seed; drop it.
        };
        let seed = self.seeds.get(&id).cloned()?;

        let decayed = priority * DECAY_GAMMA;
        if let Some(bookkeeping) = self.priorities.get_mut(&id) {
            bookkeeping.priority = decayed;
        }
        self.insertion_counter += 1;
        let version = self.bump_version(id);
        self.heap.push(HeapEntry {
            priority: decayed,
            insertion_order: self.insertion_counter,
            id,
            version,
        });

        let (item_id, sequence) = self.leases.lease(id);
        Some(SchedulerItem {
            item_id,
            seed,
            path: LeasePath::Heap,
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
        }

        if let Some(bookkeeping) = self.priorities.get_mut(&id) {
            let new_priority = match self.mode {
                PriorityMode::LastScore => interestingness_score,
                PriorityMode::AvgScore => {
                    bookkeeping.score_sum += interestingness_score;
                    bookkeeping.score_count += 1;
                    bookkeeping.score_sum / bookkeeping.score_count as f64
                }
            };
            bookkeeping.priority = new_priority;
            self.insertion_counter += 1;
            let version = self.bump_version(id);
            self.heap.push(HeapEntry {
                priority: new_priority,
                insertion_order: self.insertion_counter,
                id,
                version,
            });
        }

        self.leases.mark_updated(id);
    }

    pub fn empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        let mean_priority = if self.priorities.is_empty() {
            0.0
        } else {
            self.priorities.values().map(|p| p.priority).sum::<f64>() / self.priorities.len() as f64
        };
        SchedulerStats {
            kind: "heap",
            size: self.seeds.len(),
            total_leased: self.leases.total_leased,
            total_updated: self.leases.total_updated,
            extra: serde_json::json!({ "mean_priority": mean_priority }),
        }
    }

    pub fn debug_dump(&self, limit: usize) -> serde_json::Value {
        let mut entries: Vec<_> = self
            .priorities
            .iter()
            .map(|(id, b)| (id.0, b.priority))
            .collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        entries.truncate(limit);
        serde_json::json!({ "kind": "heap", "top_priorities": entries })
    }

    pub fn seed_stats(&self) -> Vec<SeedStats> {
        self.stats.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Bucket;
    use rand::SeedableRng;

    fn seed(id: u64) -> Seed {
        Seed::new(SeedId(id), vec![id as u8], Bucket::new("valid"), "target")
    }

    fn scheduler(mode: PriorityMode) -> HeapScheduler {
        HeapScheduler::new(mode, StdRng::seed_from_u64(42))
    }

    #[test]
    fn higher_avg_score_is_returned_first() {
        let mut scheduler = scheduler(PriorityMode::AvgScore);
        scheduler.add(seed(1), None);
        scheduler.add(seed(2), None);

        let item1 = scheduler.next().unwrap();
        let item2 = scheduler.next().unwrap();
        scheduler.update(item1, 0.9, &Signals::default());
        scheduler.update(item2, 0.1, &Signals::default());

        let next = scheduler.next().unwrap();
        assert_eq!(next.seed.id, SeedId(1));
    }

    #[test]
    fn last_score_mode_uses_most_recent_value() {
        let mut scheduler = scheduler(PriorityMode::LastScore);
        scheduler.add(seed(1), None);
        scheduler.add(seed(2), None);

        let item1 = scheduler.next().unwrap();
        let item2 = scheduler.next().unwrap();
        scheduler.update(item1, 0.2, &Signals::default());
        scheduler.update(item2, 0.9, &Signals::default());

        let next = scheduler.next().unwrap();
        assert_eq!(next.seed.id, SeedId(2));
    }

    #[test]
    fn next_on_empty_is_none() {
        let mut scheduler = scheduler(PriorityMode::AvgScore);
        assert!(scheduler.next().is_none());
    }

    #[test]
    fn stale_second_update_is_a_no_op() {
        let mut scheduler = scheduler(PriorityMode::AvgScore);
        scheduler.add(seed(1), None);
        let item = scheduler.next().unwrap();
        scheduler.update(item.clone(), 0.5, &Signals::default());
        scheduler.update(item, 0.9, &Signals::default());
        assert_eq!(scheduler.stats().total_updated, 1);
    }

    #[test]
    fn update_after_next_leaves_a_single_live_entry_per_seed() {
        let mut scheduler = scheduler(PriorityMode::AvgScore);
        scheduler.add(seed(1), None);
        let item = scheduler.next().unwrap();
        scheduler.update(item, 0.7, &Signals::default());

        let mut live_count = 0;
        while let Some(entry) = scheduler.heap.pop() {
            if scheduler.versions.get(&entry.id) == Some(&entry.version) {
                live_count += 1;
            }
        }
        assert_eq!(live_count, 1);
    }

    #[test]
    fn many_lease_update_cycles_never_lease_a_stale_entry() {
        let mut scheduler = scheduler(PriorityMode::AvgScore);
        scheduler.add(seed(1), None);
        scheduler.add(seed(2), None);

        for _ in 0..10 {
            let item = scheduler.next().unwrap();
            let id = item.seed.id;
            // Drive seed 1's priority down and seed 2's priority up so a
            // stale high-priority duplicate for seed 1 would be leased
            // ahead of seed 2 if it were never invalidated.
            let score = if id == SeedId(1) { 0.0 } else { 1.0 };
            scheduler.update(item, score, &Signals::default());
        }

        let next = scheduler.next().unwrap();
        assert_eq!(next.seed.id, SeedId(2));
    }
}
