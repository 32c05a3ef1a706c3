//! Configuration surface for the scheduling core (§6).
//!
//! Generalizes the teacher's `#[repr(C)]` FFI config struct
//! (`HarnessType`/`SchedulerType`/`PeelFuzzConfig`) into a plain Rust
//! type: the FFI boundary itself belonged to the execution engine,
//! which is out of scope for this crate.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hybrid::HybridConfig;
use crate::power::PowerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    Queue,
    Heap,
    UcbTree,
}

impl SchedulerKind {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "queue" => Ok(Self::Queue),
            "heap" => Ok(Self::Heap),
            "ucb_tree" => Ok(Self::UcbTree),
            other => Err(ConfigError::UnknownSchedulerKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityMode {
    AvgScore,
    LastScore,
}

impl PriorityMode {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "avg_score" => Ok(Self::AvgScore),
            "last_score" => Ok(Self::LastScore),
            other => Err(ConfigError::UnknownPriorityMode(other.to_string())),
        }
    }
}

impl Default for PriorityMode {
    fn default() -> Self {
        Self::AvgScore
    }
}

/// The full configuration surface from §6, validated eagerly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scheduler_kind: SchedulerKind,
    #[serde(default)]
    pub priority_mode: PriorityMode,
    #[serde(default = "default_ucb_c")]
    pub ucb_c: f64,
    #[serde(default = "default_max_seeds_per_leaf")]
    pub max_seeds_per_leaf: usize,
    pub power: PowerConfig,
    pub hybrid: HybridConfig,
    pub rng_seed: Option<u64>,
}

fn default_ucb_c() -> f64 {
    1.0
}

fn default_max_seeds_per_leaf() -> usize {
    8
}

impl Default for Config {
    fn default() -> Self {
        let power = PowerConfig::default();
        Self {
            scheduler_kind: SchedulerKind::Queue,
            priority_mode: PriorityMode::default(),
            ucb_c: default_ucb_c(),
            max_seeds_per_leaf: default_max_seeds_per_leaf(),
            power,
            hybrid: HybridConfig::with_power_defaults(power),
            rng_seed: None,
        }
    }
}

impl Config {
    /// Validate the ConfigurationError conditions of §7 eagerly.
    /// Unknown-kind/mode errors are unrepresentable once `scheduler_kind`
    /// and `priority_mode` are already typed enums; they only surface
    /// when parsing untyped strings via `SchedulerKind::parse`/
    /// `PriorityMode::parse` at the CLI/config-file boundary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.power.min_energy == 0 {
            return Err(ConfigError::ZeroMinEnergy(self.power.min_energy));
        }
        if self.power.min_energy > self.power.max_energy {
            return Err(ConfigError::InvalidEnergyBounds {
                min: self.power.min_energy,
                max: self.power.max_energy,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_min_energy_is_rejected() {
        let mut config = Config::default();
        config.power.min_energy = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroMinEnergy(0)));
    }

    #[test]
    fn min_greater_than_max_is_rejected() {
        let mut config = Config::default();
        config.power.min_energy = 200;
        config.power.max_energy = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEnergyBounds { .. })
        ));
    }

    #[test]
    fn unknown_scheduler_kind_is_rejected() {
        assert_eq!(
            SchedulerKind::parse("bogus"),
            Err(ConfigError::UnknownSchedulerKind("bogus".to_string()))
        );
    }

    #[test]
    fn unknown_priority_mode_is_rejected() {
        assert_eq!(
            PriorityMode::parse("bogus"),
            Err(ConfigError::UnknownPriorityMode("bogus".to_string()))
        );
    }
}
