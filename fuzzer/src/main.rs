//! `hivefuzz` — a minimal owner loop proving `hivefuzz-core`'s API is
//! usable end-to-end. It seeds a toy corpus, runs an in-process toy
//! target under `catch_unwind`, and drives the scheduler/power-budget
//! cycle described by the core crate. It is not a competitive fuzzer.

mod target;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use hivefuzz_core::config::{Config, PriorityMode, SchedulerKind};
use hivefuzz_core::hybrid::HybridState;
use hivefuzz_core::power::{compute_power_schedule, UniformWeights};
use hivefuzz_core::scorer::score;
use hivefuzz_core::{Bucket, Seed, SeedId, SeedMetadata, SeedScheduler};

use target::run_target;

/// Drive the hivefuzz-core scheduling loop against a toy in-process target.
#[derive(Parser)]
#[command(name = "hivefuzz", author, version, about, long_about = None)]
struct Cli {
    /// Seed scheduler backend: queue, heap, or ucb_tree.
    #[arg(long, default_value = "ucb_tree")]
    scheduler: String,

    /// Priority mode for the heap backend: avg_score or last_score.
    #[arg(long, default_value = "avg_score")]
    priority_mode: String,

    /// Use the stateful Exploration/FAST hybrid power scheduler instead
    /// of the uniform baseline.
    #[arg(long)]
    hybrid: bool,

    /// Number of seeds to initialize the toy corpus with.
    #[arg(long, default_value_t = 8)]
    corpus_size: u64,

    /// Number of scheduler lease/update cycles to run.
    #[arg(long, default_value_t = 200)]
    iterations: u64,

    /// RNG seed, for reproducible runs.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = Config {
        scheduler_kind: SchedulerKind::parse(&cli.scheduler)
            .context("parsing --scheduler")?,
        priority_mode: PriorityMode::parse(&cli.priority_mode)
            .context("parsing --priority-mode")?,
        rng_seed: Some(cli.seed),
        ..Config::default()
    };
    config.validate().context("validating configuration")?;

    run(&cli, config)
}

fn run(cli: &Cli, config: Config) -> Result<()> {
    let mut scheduler = SeedScheduler::new(&config);
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut global_coverage = vec![0u32; target::COVERAGE_MAP_SIZE];
    let mut hybrid = cli
        .hybrid
        .then(|| HybridState::new(config.hybrid, config.power));
    let mut next_seed_id = cli.corpus_size;

    for i in 0..cli.corpus_size {
        let len = rng.random_range(1..32);
        let payload: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        scheduler.add(Seed::new(SeedId(i), payload, Bucket::new("valid"), "toy"), None);
    }

    for iteration in 0..cli.iterations {
        let Some(item) = scheduler.next() else {
            tracing::info!("corpus exhausted, stopping early");
            break;
        };
        let parent_id = item.seed.id;

        let energy = match &hybrid {
            Some(state) => state.assign_energy(parent_id, "default"),
            None => {
                let stats = scheduler.seed_stats();
                let result = compute_power_schedule(&stats, config.power, &UniformWeights);
                result.energy_for(parent_id).unwrap_or(config.power.min_energy)
            }
        };

        let mut best_score = 0.0;
        let mut best_signals = hivefuzz_core::Signals::default();
        let mut found_new_path = false;

        for _ in 0..energy {
            let candidate = mutate(&item.seed.payload, &mut rng);
            let signals = run_target(&candidate, &mut global_coverage);
            let candidate_score = score(&signals);

            if signals.new_coverage {
                found_new_path = true;
            }

            if candidate_score > 0.0 {
                let child_id = SeedId(next_seed_id);
                next_seed_id += 1;
                let metadata = SeedMetadata {
                    parent: Some(parent_id),
                    signals: Some(signals.clone()),
                    ..Default::default()
                };
                scheduler.add(
                    Seed::new(child_id, candidate, Bucket::new("generated"), "toy")
                        .with_metadata(metadata.clone()),
                    Some(metadata),
                );
                if let Some(state) = &mut hybrid {
                    state.add_new_seed(child_id, "default", Some(parent_id));
                    if signals.new_coverage {
                        state.on_new_path_discovered("default", Some(parent_id));
                    } else {
                        state.record_path_execution("default");
                    }
                }
            }

            if candidate_score > best_score {
                best_score = candidate_score;
                best_signals = signals;
            }
        }

        scheduler.update(item, best_score, &best_signals);
        if let Some(state) = &mut hybrid {
            state.on_loop_completed(found_new_path);
        }

        tracing::info!(
            iteration,
            seed_id = parent_id.0,
            energy,
            best_score,
            "lease cycle completed"
        );
    }

    let stats = scheduler.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// A single random-byte-flip or append mutation, the simplest possible
/// mutator strategy — enough to exercise the scheduling core honestly.
fn mutate(payload: &[u8], rng: &mut StdRng) -> Vec<u8> {
    let mut candidate = payload.to_vec();
    if candidate.is_empty() || rng.random_bool(0.3) {
        candidate.push(rng.random());
    } else {
        let index = rng.random_range(0..candidate.len());
        candidate[index] = rng.random();
    }
    candidate
}
