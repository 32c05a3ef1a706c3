//! `HybridPowerScheduler`: the stateful Exploration/FAST two-phase
//! scheduler layered on top of the uniform `PowerScheduler`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::power::PowerConfig;
use crate::seed::SeedId;

/// Tunable parameters from §6's hybrid configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    pub plateau_k: u32,
    pub fast_window_w: u32,
    pub breakthrough_b: u32,
    pub alpha: f64,
    pub s_cap: u32,
}

impl HybridConfig {
    /// `alpha` defaults to `min_energy * 8`, per §4.3.
    pub fn with_power_defaults(power: PowerConfig) -> Self {
        Self {
            plateau_k: 8,
            fast_window_w: 16,
            breakthrough_b: 5,
            alpha: power.min_energy as f64 * 8.0,
            s_cap: 14,
        }
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self::with_power_defaults(PowerConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Exploration,
    Fast,
}

/// Mode, plateau/breakthrough counters, per-path frequency, and
/// per-seed discovery generation — mutated only through the
/// notification operations below.
#[derive(Debug, Clone)]
pub struct HybridState {
    mode: Mode,
    plateau_count: u32,
    breakthrough_count: u32,
    fast_window_elapsed: u32,
    path_frequency: HashMap<String, u64>,
    seed_generation: HashMap<SeedId, u32>,
    config: HybridConfig,
    power_config: PowerConfig,
}

impl HybridState {
    pub fn new(config: HybridConfig, power_config: PowerConfig) -> Self {
        Self {
            mode: Mode::Exploration,
            plateau_count: 0,
            breakthrough_count: 0,
            fast_window_elapsed: 0,
            path_frequency: HashMap::new(),
            seed_generation: HashMap::new(),
            config,
            power_config,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn plateau_count(&self) -> u32 {
        self.plateau_count
    }

    pub fn breakthrough_count(&self) -> u32 {
        self.breakthrough_count
    }

    /// A new path was reached. Resets the plateau counter; in FAST
    /// mode also advances the breakthrough counter. `parent_seed_id`
    /// is accepted for symmetry with `add_new_seed` but this
    /// notification alone does not register lineage.
    pub fn on_new_path_discovered(&mut self, path_id: &str, _parent_seed_id: Option<SeedId>) {
        self.path_frequency
            .entry(path_id.to_string())
            .and_modify(|f| *f += 1)
            .or_insert(1);
        self.plateau_count = 0;
        if self.mode == Mode::Fast {
            self.breakthrough_count += 1;
        }
    }

    /// Increment a path's frequency without signalling discovery
    /// (e.g. a re-execution reaching an already-known path).
    pub fn record_path_execution(&mut self, path_id: &str) {
        self.path_frequency
            .entry(path_id.to_string())
            .and_modify(|f| *f += 1)
            .or_insert(1);
    }

    /// Drives the Exploration -> FAST -> Exploration state machine.
    pub fn on_loop_completed(&mut self, found_new_path: bool) {
        if found_new_path {
            self.plateau_count = 0;
        } else {
            self.plateau_count += 1;
        }

        match self.mode {
            Mode::Exploration => {
                if self.plateau_count >= self.config.plateau_k {
                    tracing::debug!(plateau_count = self.plateau_count, "entering FAST mode");
                    self.enter_fast();
                }
            }
            Mode::Fast => {
                self.fast_window_elapsed += 1;
                if self.breakthrough_count > self.config.breakthrough_b {
                    tracing::debug!(
                        breakthrough_count = self.breakthrough_count,
                        "breakthrough detected, returning to Exploration"
                    );
                    self.enter_exploration();
                } else if self.fast_window_elapsed >= self.config.fast_window_w {
                    // Window elapsed without breakthrough: stay in FAST,
                    // start a fresh window.
                    self.fast_window_elapsed = 0;
                    self.breakthrough_count = 0;
                }
            }
        }
    }

    fn enter_fast(&mut self) {
        self.mode = Mode::Fast;
        self.breakthrough_count = 0;
        self.fast_window_elapsed = 0;
    }

    fn enter_exploration(&mut self) {
        self.mode = Mode::Exploration;
        self.plateau_count = 0;
        self.breakthrough_count = 0;
        self.fast_window_elapsed = 0;
    }

    /// Register a derived seed with `s(child) = s(parent) + 1`.
    pub fn add_new_seed(&mut self, seed: SeedId, path_id: &str, parent: Option<SeedId>) {
        let generation = parent
            .and_then(|p| self.seed_generation.get(&p).copied())
            .map(|g| g + 1)
            .unwrap_or(0);
        self.seed_generation.insert(seed, generation);
        self.path_frequency.entry(path_id.to_string()).or_insert(0);
    }

    fn rho(&self) -> f64 {
        if self.path_frequency.is_empty() {
            return 1.0;
        }
        let sum: u64 = self.path_frequency.values().sum();
        (sum as f64 / self.path_frequency.len() as f64).max(1.0)
    }

    /// Current energy for `seed_id` on path `path_id`, per the mode's formula.
    pub fn assign_energy(&self, seed_id: SeedId, path_id: &str) -> u32 {
        match self.mode {
            Mode::Exploration => self.config.alpha.round() as u32,
            Mode::Fast => {
                let s_i = self
                    .seed_generation
                    .get(&seed_id)
                    .copied()
                    .unwrap_or(0)
                    .min(self.config.s_cap);
                let f_i = self.path_frequency.get(path_id).copied().unwrap_or(1).max(1) as f64;
                let rho = self.rho();
                let exponent = 2f64.powi(s_i as i32);
                let energy = (self.config.alpha / rho) * exponent / f_i;
                let capped = energy.min(self.power_config.max_energy as f64);
                capped.max(self.power_config.min_energy as f64).round() as u32
            }
        }
    }
}
