//! `PowerScheduler`: the uniform baseline energy allocator.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::OverflowError;
use crate::seed::{SeedId, SeedStats};

/// Power scheduler bounds. Defaults match §6: `min_energy=1, max_energy=128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerConfig {
    pub min_energy: u32,
    pub max_energy: u32,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            min_energy: 1,
            max_energy: 128,
        }
    }
}

/// Per-seed base weight. The open question in §9 lets a weighted
/// refinement plug into the same pipeline without changing the
/// scaling/clamp math below; the uniform baseline always returns `1.0`.
pub trait WeightModel {
    fn weight(&self, stats: &SeedStats) -> f64;
}

/// The documented uniform baseline: every seed gets the same base
/// weight regardless of `fuzz_count`/`exec_time_ms`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformWeights;

impl WeightModel for UniformWeights {
    fn weight(&self, _stats: &SeedStats) -> f64 {
        1.0
    }
}

/// Ephemeral output of one power-schedule computation.
#[derive(Debug, Clone, Default)]
pub struct PowerScheduleResult {
    pub energies: Vec<(SeedId, u32)>,
    pub edge_frequencies: Vec<u32>,
    pub config: PowerConfig,
    pub total_pre_clamp_weight: f64,
}

impl PowerScheduleResult {
    pub fn total_energy(&self) -> u64 {
        self.energies.iter().map(|(_, e)| *e as u64).sum()
    }

    pub fn energy_for(&self, id: SeedId) -> Option<u32> {
        self.energies
            .iter()
            .find(|(seed_id, _)| *seed_id == id)
            .map(|(_, e)| *e)
    }
}

/// Vector where index `e` holds the number of seeds whose
/// `coverage_bitmap[e] != 0`. Missing bitmaps are skipped. Pure function.
pub fn compute_edge_frequencies(seeds: &[SeedStats]) -> Vec<u32> {
    let max_len = seeds
        .iter()
        .filter_map(|s| s.coverage_bitmap.as_ref())
        .map(|b| b.len())
        .max()
        .unwrap_or(0);

    let mut frequencies = vec![0u32; max_len];
    for stats in seeds {
        let Some(bitmap) = &stats.coverage_bitmap else {
            continue;
        };
        for (edge, hit) in bitmap.iter().enumerate() {
            if *hit != 0 {
                frequencies[edge] += 1;
            }
        }
    }
    frequencies
}

/// Scale per-seed weights so the mean energy lands midway between
/// `min_energy` and `max_energy`, then clamp each seed's energy into
/// `[min_energy, max_energy]`.
pub fn compute_power_schedule(
    seeds: &[SeedStats],
    config: PowerConfig,
    weights: &impl WeightModel,
) -> PowerScheduleResult {
    let edge_frequencies = compute_edge_frequencies(seeds);

    if seeds.is_empty() {
        return PowerScheduleResult {
            energies: Vec::new(),
            edge_frequencies,
            config,
            total_pre_clamp_weight: 0.0,
        };
    }

    let raw_weights: Vec<f64> = seeds.iter().map(|s| weights.weight(s)).collect();
    let total_pre_clamp_weight: f64 = raw_weights.iter().sum();
    let mean_weight = total_pre_clamp_weight / raw_weights.len() as f64;
    let target_mean = (config.min_energy as f64 + config.max_energy as f64) / 2.0;

    let scale = if mean_weight > 0.0 {
        target_mean / mean_weight
    } else {
        target_mean
    };

    let energies = seeds
        .iter()
        .zip(raw_weights.iter())
        .map(|(stats, weight)| {
            let scaled = (weight * scale).round();
            let clamped = scaled.clamp(config.min_energy as f64, config.max_energy as f64) as u32;
            (stats.id, clamped)
        })
        .collect();

    PowerScheduleResult {
        energies,
        edge_frequencies,
        config,
        total_pre_clamp_weight,
    }
}

/// Draw a seed id with probability proportional to its energy, or
/// `None` if the result is empty.
pub fn pick_seed_id(result: &PowerScheduleResult, rng: &mut impl Rng) -> Option<SeedId> {
    if result.energies.is_empty() {
        return None;
    }
    let total: u64 = result.total_energy();
    if total == 0 {
        return result.energies.first().map(|(id, _)| *id);
    }
    let mut pick = rng.random_range(0..total);
    for (id, energy) in &result.energies {
        let energy = *energy as u64;
        if pick < energy {
            return Some(*id);
        }
        pick -= energy;
    }
    result.energies.last().map(|(id, _)| *id)
}

/// Sample `requested` distinct seed ids without replacement, weighted
/// by energy (a seed's chance of being drawn falls as pool members are
/// removed). Rejects with `OverflowError` when more seeds are
/// requested than are available, per §7.
pub fn sample_batch_by_ratio(
    result: &PowerScheduleResult,
    rng: &mut impl Rng,
    requested: usize,
) -> Result<Vec<SeedId>, OverflowError> {
    let available = result.energies.len();
    if requested > available {
        return Err(OverflowError::RequestedExceedsAvailable { requested, available });
    }

    let mut pool = result.energies.clone();
    let mut picked = Vec::with_capacity(requested);
    for _ in 0..requested {
        let total: u64 = pool.iter().map(|(_, e)| *e as u64).sum();
        let index = if total == 0 {
            0
        } else {
            let mut pick = rng.random_range(0..total);
            let mut index = pool.len() - 1;
            for (i, (_, energy)) in pool.iter().enumerate() {
                let energy = *energy as u64;
                if pick < energy {
                    index = i;
                    break;
                }
                pick -= energy;
            }
            index
        };
        let (id, _) = pool.remove(index);
        picked.push(id);
    }
    Ok(picked)
}
