//! hivefuzz-core — the seed scheduling and feedback core of a
//! coverage-guided fuzzer.
//!
//! This crate implements the hardest parts of an AFL-style fuzzer: the
//! state machines that decide which seed to fuzz next
//! ([`scheduler::SeedScheduler`]), how much mutation budget a seed
//! gets ([`power`], [`hybrid`]), and how interestingness is derived
//! from execution signals ([`scorer`]). The mutator, target runner,
//! corpus loader, and result persistence are external collaborators —
//! this crate only specifies the interfaces they're expected to meet
//! ([`signals`]).
//!
//! A typical owner loop: pull a [`seed::SchedulerItem`] from
//! [`scheduler::SeedScheduler::next`], look up its energy budget via
//! [`power::compute_power_schedule`] or [`hybrid::HybridState::assign_energy`],
//! hand it to a worker, score the result with [`scorer::score`], and
//! feed the lease summary back through
//! [`scheduler::SeedScheduler::update`].

pub mod config;
pub mod error;
pub mod hybrid;
pub mod power;
pub mod scheduler;
pub mod scorer;
pub mod seed;
pub mod signals;

pub use config::Config;
pub use error::{ConfigError, OverflowError, SchedulerWarning};
pub use hybrid::{HybridConfig, HybridState, Mode as HybridMode};
pub use power::{PowerConfig, PowerScheduleResult};
pub use scheduler::{SchedulerStats, SeedScheduler};
pub use seed::{Bucket, Seed, SeedId, SeedMetadata, SeedStats};
pub use signals::{BugSignature, Signals, Status, WrappedSignals};
