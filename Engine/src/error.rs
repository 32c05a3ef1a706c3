//! Error and warning types for the scheduling core.
//!
//! Configuration errors are fatal at construction time; everything
//! else a worker can hand back to the owner is recovered locally and
//! only logged (see `SchedulerWarning`).

use thiserror::Error;

/// Fatal at construction: rejects a `Config` before any scheduler is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown seed scheduler kind: {0:?}")]
    UnknownSchedulerKind(String),

    #[error("unknown priority mode: {0:?}")]
    UnknownPriorityMode(String),

    #[error("invalid energy bounds: min_energy ({min}) > max_energy ({max})")]
    InvalidEnergyBounds { min: u32, max: u32 },

    #[error("min_energy must be at least 1, got {0}")]
    ZeroMinEnergy(u32),
}

/// Surfaced to the owner when a batch request cannot be satisfied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverflowError {
    #[error("requested {requested} seeds but only {available} are available")]
    RequestedExceedsAvailable { requested: usize, available: usize },
}

/// Non-fatal conditions recovered locally. Never returned from public
/// APIs as an `Err` — logged via `tracing` at the point of occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerWarning {
    StaleLease {
        item_id: u64,
        expected_seq: u64,
        got_seq: u64,
    },
    SignalParseFallback {
        field: &'static str,
    },
}

impl SchedulerWarning {
    pub fn log(&self) {
        match self {
            SchedulerWarning::StaleLease {
                item_id,
                expected_seq,
                got_seq,
            } => {
                tracing::warn!(
                    item_id,
                    expected_seq,
                    got_seq,
                    "discarding update for stale lease"
                );
            }
            SchedulerWarning::SignalParseFallback { field } => {
                tracing::debug!(field, "signal field missing or malformed, using default");
            }
        }
    }
}
