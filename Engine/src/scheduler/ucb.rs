//! UCB1 bandit tree backend: a three-level tree (root -> coverage
//! buckets -> bug/output buckets -> leaf seed-lists) that concentrates
//! effort on under-explored execution behaviours, per §4.4.3.

use std::collections::HashMap;

use rand::rngs::StdRng;

use crate::scheduler::{LeaseTracker, SchedulerStats};
use crate::seed::{LeasePath, Seed, SeedId, SeedMetadata, SeedStats};
use crate::seed::SchedulerItem;
use crate::signals::{self, Signals};

pub type NodeId = u64;
const ROOT: NodeId = 0;

struct Node {
    children: Vec<(String, NodeId)>,
    n: u64,
    q: f64,
    /// `Some` only for leaf nodes (bug/output buckets); holds the
    /// seed ids assigned there in insertion (FIFO) order.
    seeds: Option<Vec<SeedId>>,
}

impl Node {
    fn branch() -> Self {
        Self {
            children: Vec::new(),
            n: 0,
            q: 0.0,
            seeds: None,
        }
    }

    fn leaf() -> Self {
        Self {
            children: Vec::new(),
            n: 0,
            q: 0.0,
            seeds: Some(Vec::new()),
        }
    }
}

pub struct UcbScheduler {
    nodes: Vec<Node>,
    seeds: HashMap<SeedId, Seed>,
    stats: HashMap<SeedId, SeedStats>,
    leases: LeaseTracker,
    ucb_c: f64,
    max_seeds_per_leaf: usize,
    #[allow(dead_code)]
    rng: StdRng,
    len: usize,
}

impl UcbScheduler {
    pub fn new(ucb_c: f64, max_seeds_per_leaf: usize, rng: StdRng) -> Self {
        Self {
            nodes: vec![Node::branch()], // index 0 = root
            seeds: HashMap::new(),
            stats: HashMap::new(),
            leases: LeaseTracker::default(),
            ucb_c,
            max_seeds_per_leaf: max_seeds_per_leaf.max(1),
            rng,
            len: 0,
        }
    }

    fn find_child(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[parent as usize]
            .children
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, id)| *id)
    }

    fn get_or_create_branch(&mut self, parent: NodeId, key: &str) -> NodeId {
        if let Some(id) = self.find_child(parent, key) {
            return id;
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::branch());
        self.nodes[parent as usize].children.push((key.to_string(), id));
        id
    }

    fn get_or_create_leaf(&mut self, parent: NodeId, key: &str) -> NodeId {
        if let Some(id) = self.find_child(parent, key) {
            return id;
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::leaf());
        self.nodes[parent as usize].children.push((key.to_string(), id));
        id
    }

    fn bucket_keys(metadata: Option<&SeedMetadata>) -> (String, String) {
        let fallback_signals = Signals::default();
        let sig = metadata
            .and_then(|m| m.signals.as_ref())
            .unwrap_or(&fallback_signals);
        (
            signals::resolve_coverage_key(sig),
            signals::resolve_bug_key(sig),
        )
    }

    /// Place `seed` under `root/coverage_key/bug_key`, splitting by
    /// discriminator suffix when the target leaf is at capacity.
    pub fn add(&mut self, seed: Seed, metadata: Option<SeedMetadata>) {
        let id = seed.id;
        if self.seeds.contains_key(&id) {
            return;
        }
        let (coverage_key, bug_key) = Self::bucket_keys(metadata.as_ref());
        let coverage_node = self.get_or_create_branch(ROOT, &coverage_key);

        let mut discriminator = 0u32;
        let mut candidate_key = bug_key.clone();
        loop {
            let leaf = self.get_or_create_leaf(coverage_node, &candidate_key);
            let seeds = self.nodes[leaf as usize].seeds.as_mut().expect("leaf node");
            if seeds.len() < self.max_seeds_per_leaf {
                seeds.push(id);
                break;
            }
            discriminator += 1;
            candidate_key = format!("{bug_key}#{discriminator}");
        }

        self.stats.insert(id, SeedStats::new(id));
        self.seeds.insert(id, seed);
        self.len += 1;
    }

    fn ucb_score(&self, parent_n: u64, child: NodeId) -> f64 {
        let node = &self.nodes[child as usize];
        if node.n == 0 {
            return f64::INFINITY;
        }
        node.q + self.ucb_c * ((parent_n as f64).ln() / node.n as f64).sqrt()
    }

    fn select_child(&self, parent: NodeId) -> Option<NodeId> {
        let node = &self.nodes[parent as usize];
        if node.children.is_empty() {
            return None;
        }
        let parent_n = node.n.max(1);
        node.children
            .iter()
            .map(|(_, id)| *id)
            .max_by(|a, b| {
                self.ucb_score(parent_n, *a)
                    .partial_cmp(&self.ucb_score(parent_n, *b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn next(&mut self) -> Option<SchedulerItem> {
        if self.seeds.is_empty() {
            return None;
        }

        let mut path = vec![ROOT];
        let mut current = ROOT;
        while let Some(child) = self.select_child(current) {
            path.push(child);
            current = child;
        }
        let leaf = &self.nodes[current as usize];
        let leaf_seeds = leaf.seeds.as_ref()?;
        if leaf_seeds.is_empty() {
            return None;
        }

        // Fewest fuzz_count wins; ties break FIFO (earliest insertion).
        let id = leaf_seeds
            .iter()
            .enumerate()
            .min_by_key(|&(index, seed_id)| {
                let fuzz_count = self.stats.get(seed_id).map(|s| s.fuzz_count).unwrap_or(0);
                (fuzz_count, index)
            })
            .map(|(_, seed_id)| *seed_id)?;

        let seed = self.seeds.get(&id).cloned()?;
        let (item_id, sequence) = self.leases.lease(id);
        Some(SchedulerItem {
            item_id,
            seed,
            path: LeasePath::Ucb { node_path: path },
            sequence,
        })
    }

    fn reward(signals: &Signals) -> f64 {
        let mut r = 0.0;
        if signals.new_coverage {
            r += 1.0;
        }
        if signals.new_bug {
            r += 2.0;
        }
        if signals.crash || signals.timeout {
            r += 3.0;
        }
        r
    }

    pub fn update(&mut self, item: SchedulerItem, _interestingness_score: f64, signals: &Signals) {
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

        let LeasePath::Ucb { node_path } = &item.path else {
            return;
        };

        let reward = Self::reward(signals);
        for &node_id in node_path {
            let node = &mut self.nodes[node_id as usize];
            node.n += 1;
            node.q += (reward - node.q) / node.n as f64;
        }

        if let Some(stats) = self.stats.get_mut(&id) {
            stats.fuzz_count += 1;
            if let Some(bitmap) = &signals.coverage_bitmap {
                stats.coverage_bitmap = Some(bitmap.clone());
            }
        }

        self.leases.mark_updated(id);
        self.check_invariants();
    }

    fn check_invariants(&self) {
        for node in &self.nodes {
            if node.seeds.is_some() {
                continue;
            }
            let children_n: u64 = node.children.iter().map(|(_, id)| self.nodes[*id as usize].n).sum();
            debug_assert_eq!(node.n, children_n, "N(parent) must equal sum of N(child)");
        }
    }

    pub fn empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            kind: "ucb_tree",
            size: self.len,
            total_leased: self.leases.total_leased,
            total_updated: self.leases.total_updated,
            extra: serde_json::json!({ "tree_nodes": self.nodes.len() }),
        }
    }

    pub fn debug_dump(&self, limit: usize) -> serde_json::Value {
        let mut leaves: Vec<_> = self
            .nodes
            .iter()
            .filter(|n| n.seeds.is_some())
            .map(|n| {
                serde_json::json!({
                    "n": n.n,
                    "q": n.q,
                    "seed_count": n.seeds.as_ref().map(|s| s.len()).unwrap_or(0),
                })
            })
            .collect();
        leaves.truncate(limit);
        serde_json::json!({ "kind": "ucb_tree", "leaves": leaves })
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

    fn metadata_with_coverage(key: &str) -> SeedMetadata {
        SeedMetadata {
            signals: Some(Signals {
                coverage_key: Some(key.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn scheduler() -> UcbScheduler {
        UcbScheduler::new(1.0, 8, StdRng::seed_from_u64(7))
    }

    #[test]
    fn reward_propagates_along_full_path() {
        let mut scheduler = scheduler();
        scheduler.add(seed(1), Some(metadata_with_coverage("cov:A")));

        let item = scheduler.next().unwrap();
        assert_eq!(item.seed.id, SeedId(1));

        let signals = Signals {
            new_coverage: true,
            ..Default::default()
        };
        scheduler.update(item, 0.0, &signals);

        for node in &scheduler.nodes {
            if node.n > 0 {
                assert_eq!(node.n, 1);
                assert!((node.q - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn unvisited_children_are_preferred() {
        let mut scheduler = scheduler();
        scheduler.add(seed(1), Some(metadata_with_coverage("cov:A")));
        scheduler.add(seed(2), Some(metadata_with_coverage("cov:B")));

        // Both coverage buckets start unvisited (+inf); whichever is
        // picked first gets its N bumped, then the other must win next.
        let first = scheduler.next().unwrap();
        scheduler.update(
            first.clone(),
            0.0,
            &Signals {
                new_coverage: true,
                ..Default::default()
            },
        );
        let second = scheduler.next().unwrap();
        assert_ne!(first.seed.id, second.seed.id);
    }

    #[test]
    fn leaf_overflow_splits_by_discriminator() {
        let mut scheduler = UcbScheduler::new(1.0, 2, StdRng::seed_from_u64(1));
        for i in 0..5 {
            scheduler.add(seed(i), Some(metadata_with_coverage("cov:A")));
        }
        let leaf_count = scheduler.nodes.iter().filter(|n| n.seeds.is_some()).count();
        assert!(leaf_count >= 3, "expected overflow to create extra leaves, got {leaf_count}");
        assert_eq!(scheduler.len(), 5);
    }

    #[test]
    fn next_on_empty_is_none() {
        let mut scheduler = scheduler();
        assert!(scheduler.next().is_none());
    }

    #[test]
    fn stale_update_does_not_double_apply_reward() {
        let mut scheduler = scheduler();
        scheduler.add(seed(1), Some(metadata_with_coverage("cov:A")));
        let item = scheduler.next().unwrap();
        let replay = item.clone();
        scheduler.update(item, 0.0, &Signals::default());
        scheduler.update(replay, 0.0, &Signals {
            new_bug: true,
            ..Default::default()
        });
        // Second update is stale (sequence already advanced); root N stays 1.
        assert_eq!(scheduler.nodes[ROOT as usize].n, 1);
    }
}
