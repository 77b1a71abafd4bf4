//! gemtrack CLI: Command-line interface for GEM straight-line tracking.
//!
//! Reads a JSON detector setup and JSON-lines event files, and writes the
//! tracks found.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use gemtrack_algorithms::{track_events, EventResult, SearchStatistics};
use gemtrack_core::config::SearchStrategy;
use gemtrack_core::event::Event;
use gemtrack_io::{read_events, write_track_files, SetupConfig};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    GemtrackIo(#[from] gemtrack_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] gemtrack_core::Error),
}

/// Combination search strategy.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// Boundary-layer seeding with grid-pruned middle layers
    Grid,
    /// Every hit combination, no pruning
    Exhaustive,
}

impl From<Strategy> for SearchStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Grid => Self::Grid,
            Strategy::Exhaustive => Self::Exhaustive,
        }
    }
}

/// Straight-line track finder for layered GEM detectors.
#[derive(Parser)]
#[command(name = "gemtrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (sets the default log level to info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find tracks in an event file
    Track {
        /// Detector setup (JSON)
        #[arg(short, long)]
        setup: PathBuf,

        /// Input event file (JSON lines)
        input: PathBuf,

        /// Output file path (.csv for a track table, anything else for JSON lines)
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the hits of every retained track as CSV
        #[arg(long)]
        hits: Option<PathBuf>,

        /// Override the setup's search strategy
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,

        /// Process events on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Describe a detector setup
    Info {
        /// Detector setup (JSON)
        setup: PathBuf,
    },

    /// Compare search strategies on an event file
    Benchmark {
        /// Detector setup (JSON)
        #[arg(short, long)]
        setup: PathBuf,

        /// Input event file (JSON lines)
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn load_events(input: &Path) -> Result<Vec<Event>> {
    let events = read_events(input)?;
    info!("Read {} events from {}", events.len(), input.display());
    Ok(events)
}

fn total_statistics(results: &[EventResult]) -> SearchStatistics {
    let mut total = SearchStatistics::default();
    for result in results {
        total.merge(&result.statistics);
    }
    total
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Track {
            setup,
            input,
            output,
            hits,
            strategy,
            sequential,
        } => {
            let mut config = SetupConfig::from_file(&setup)?;
            if let Some(strategy) = strategy {
                config.cuts.strategy = strategy.into();
            }
            info!("Search strategy: {}", config.cuts.strategy);

            let system = config.build_system()?;
            let events = load_events(&input)?;

            let start = Instant::now();
            let results = track_events(&system, &events, !sequential)?;
            let elapsed = start.elapsed();

            write_track_files(&results, &output, hits.as_deref())?;

            let with_track = results.iter().filter(|r| r.best.is_some()).count();
            let unrouted: usize = results.iter().map(|r| r.routing.unrouted).sum();
            let stats = total_statistics(&results);

            println!(
                "Processed {} events in {:.2}s",
                results.len(),
                elapsed.as_secs_f64()
            );
            println!("Events with a track: {}", with_track);
            println!("Combinations examined: {}", stats.combinations_examined);
            println!(
                "Branches skipped by abort guard: {}",
                stats.groups_aborted + stats.pairs_aborted
            );
            if unrouted > 0 {
                println!("Hits on unknown layers: {}", unrouted);
            }
        }

        Commands::Info { setup } => {
            let config = SetupConfig::from_file(&setup)?;
            let system = config.build_system()?;
            let cuts = &config.cuts;

            println!("Setup: {}", setup.display());
            println!(
                "Layers: {} ({} tracking)",
                config.layers.len(),
                config.tracking_layer_count()
            );
            println!(
                "{:<6} | {:<10} | {:<20} | {:<8} | {:<10}",
                "Layer", "Z (mm)", "Size (mm)", "Tracking", "Grid"
            );
            println!("{:-<66}", "");
            for layer in system.detector().layers() {
                let [dx, dy, _] = layer.placement().dimension;
                let (nx, ny) = layer.grid().shape();
                println!(
                    "{:<6} | {:<10.1} | {:<20} | {:<8} | {:<10}",
                    layer.id(),
                    layer.z(),
                    format!("{} x {}", dx, dy),
                    if layer.is_tracking() { "yes" } else { "no" },
                    format!("{} x {}", nx, ny)
                );
            }

            println!();
            println!(
                "Grid: {} x {} mm cells, shift {} mm, margins {:.2} / {:.2} mm",
                config.grid.width_x,
                config.grid.width_y,
                config.grid.shift,
                config.grid.margin_x(),
                config.grid.margin_y()
            );
            println!(
                "Cuts: min hits {}, chi2/ndf <= {}, abort quantity {}, keep {}",
                cuts.minimum_hits_on_track,
                cuts.chi2_cut,
                cuts.abort_quantity,
                cuts.max_track_save_quantity
            );
            println!(
                "Slopes: x-z [{}, {}], y-z [{}, {}]",
                cuts.slope_xz.min, cuts.slope_xz.max, cuts.slope_yz.min, cuts.slope_yz.max
            );
            println!("Strategy: {}", cuts.strategy);

            println!();
            let groups = system.finder().layer_groups();
            println!("Layer groups: {}", groups.total());
            for size in groups.sizes_descending() {
                let listed: Vec<String> = groups
                    .get(size)
                    .iter()
                    .map(|g| format!("{:?}", g))
                    .collect();
                println!("  {} layers: {}", size, listed.join(" "));
            }
        }

        Commands::Benchmark {
            setup,
            input,
            iterations,
        } => {
            let config = SetupConfig::from_file(&setup)?;
            let events = load_events(&input)?;

            println!(
                "Benchmarking with {} events, {} iterations",
                events.len(),
                iterations
            );
            println!(
                "{:<10} | {:<15} | {:<15} | {:<15} | {:<8} | {:<12}",
                "Strategy",
                "Mean Time (ms)",
                "Min Time (ms)",
                "Max Time (ms)",
                "Tracks",
                "Combinations"
            );
            println!("{:-<90}", "");

            let mut best_by_strategy = Vec::new();
            for strategy in [Strategy::Grid, Strategy::Exhaustive] {
                let mut run_config = config.clone();
                run_config.cuts.strategy = strategy.into();
                let system = run_config.build_system()?;

                // Warmup
                let results = track_events(&system, &events, false)?;

                let mut times = Vec::with_capacity(iterations);
                for _ in 0..iterations {
                    let start = Instant::now();
                    let _ = track_events(&system, &events, false)?;
                    times.push(start.elapsed().as_secs_f64() * 1000.0);
                }

                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = if times.is_empty() {
                    0.0
                } else {
                    times.iter().sum::<f64>() / times.len() as f64
                };

                let found = results.iter().filter(|r| r.best.is_some()).count();
                let stats = total_statistics(&results);
                println!(
                    "{:<10} | {:<15.3} | {:<15.3} | {:<15.3} | {:<8} | {:<12}",
                    SearchStrategy::from(strategy),
                    mean_time,
                    min_time,
                    max_time,
                    found,
                    stats.combinations_examined
                );

                best_by_strategy.push(
                    results
                        .into_iter()
                        .map(|r| r.best.map(|t| t.hits))
                        .collect::<Vec<_>>(),
                );
            }

            if let [grid, exhaustive] = best_by_strategy.as_slice() {
                let agree = grid.iter().zip(exhaustive).filter(|(a, b)| a == b).count();
                println!();
                println!(
                    "Best tracks agree on {} of {} events",
                    agree,
                    events.len()
                );
            }
        }
    }

    Ok(())
}
