//! Property-based tests against the public API, covering the
//! quantified invariants: energy stays within its configured bounds for
//! every seed, the scorer never leaves `[0.0, 1.0]`, and two schedulers
//! built from the same config/seed/call-sequence end up identical.

use proptest::prelude::*;

use hivefuzz_core::config::{Config, PriorityMode, SchedulerKind};
use hivefuzz_core::power::{compute_power_schedule, UniformWeights};
use hivefuzz_core::scorer::score;
use hivefuzz_core::{Bucket, PowerConfig, Seed, SeedId, SeedScheduler, SeedStats, Signals, Status};

fn config_with(kind: SchedulerKind, rng_seed: u64) -> Config {
    Config {
        scheduler_kind: kind,
        priority_mode: PriorityMode::AvgScore,
        rng_seed: Some(rng_seed),
        ..Config::default()
    }
}

fn signals_arbitrary() -> impl Strategy<Value = Signals> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        prop_oneof![
            Just(Status::Ok),
            Just(Status::Bug),
            Just(Status::Crash),
            Just(Status::Timeout),
        ],
    )
        .prop_map(|(new_coverage, new_bug, crash, timeout, status)| Signals {
            new_coverage,
            new_bug,
            crash,
            timeout,
            status,
            ..Default::default()
        })
}

proptest! {
    #[test]
    fn scorer_output_is_always_in_unit_range(signals in signals_arbitrary()) {
        let value = score(&signals);
        prop_assert!((0.0..=1.0).contains(&value));
    }

    #[test]
    fn power_schedule_energies_stay_within_configured_bounds(
        min_energy in 1u32..64,
        spread in 0u32..512,
        seed_count in 0usize..40,
    ) {
        let config = PowerConfig {
            min_energy,
            max_energy: min_energy + spread,
        };
        let seeds: Vec<SeedStats> = (0..seed_count as u64).map(SeedStats::new).collect();
        let result = compute_power_schedule(&seeds, config, &UniformWeights);

        prop_assert_eq!(result.energies.len(), seeds.len());
        for (_, energy) in &result.energies {
            prop_assert!(*energy >= config.min_energy);
            prop_assert!(*energy <= config.max_energy);
        }
    }

    #[test]
    fn fifo_scheduler_is_deterministic_for_identical_call_sequences(
        seed_count in 1u64..12,
        scores in prop::collection::vec(0.0f64..1.0, 1..12),
    ) {
        let make = || {
            let config = config_with(SchedulerKind::Queue, 99);
            let mut scheduler = SeedScheduler::new(&config);
            for i in 0..seed_count {
                scheduler.add(Seed::new(SeedId(i), vec![i as u8], Bucket::new("valid"), "prop"), None);
            }
            scheduler
        };
        let mut a = make();
        let mut b = make();

        for &s in scores.iter().cycle().take(seed_count as usize) {
            if let (Some(item_a), Some(item_b)) = (a.next(), b.next()) {
                prop_assert_eq!(item_a.seed.id, item_b.seed.id);
                a.update(item_a, s, &Signals::default());
                b.update(item_b, s, &Signals::default());
            }
        }

        prop_assert_eq!(a.stats().total_updated, b.stats().total_updated);
        prop_assert_eq!(a.len(), b.len());
    }
}
