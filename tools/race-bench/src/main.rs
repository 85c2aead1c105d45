// Copyright 2026 Race Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: race-bench command-line entry point
//! OWNERS: @runtime
//! NOTE: Without a subcommand every primitive is raced with default settings

use std::io::{self, Write};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use race_bench::apartments;
use race_bench::readers_writers::{self, RwConfig};
use race_bench::{Primitive, RaceConfig, RaceDriver, ReportFormat, Result};

#[derive(Parser, Debug)]
#[command(name = "race-bench", version, about = "Race synchronization primitives against each other")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Time every primitive on the shared race track (default).
    Race(RaceArgs),
    /// Filter synthetic apartments sequentially and in parallel.
    Apartments(ApartmentArgs),
    /// Run periodic readers and writers over a reader/writer lock.
    ReadersWriters(RwArgs),
}

#[derive(Args, Debug)]
struct RaceArgs {
    /// Workers per trial.
    #[arg(long, default_value_t = race_bench::config::DEFAULT_THREADS)]
    threads: usize,
    /// Track cells (laps per worker).
    #[arg(long, default_value_t = race_bench::config::DEFAULT_RACE_LENGTH)]
    length: usize,
    /// Exclusive bound on simulated work units per lap.
    #[arg(long, default_value_t = race_bench::config::DEFAULT_MAX_DELAY_UNITS)]
    max_delay: u32,
    /// Length of one work unit in microseconds.
    #[arg(long, default_value_t = 1_000)]
    unit_micros: u64,
    /// Fixed seed for reproducible delays.
    #[arg(long)]
    seed: Option<u64>,
    /// Race only these primitives, in the order given.
    #[arg(long, value_enum, num_args = 1..)]
    only: Vec<Primitive>,
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

impl Default for RaceArgs {
    fn default() -> Self {
        Self {
            threads: race_bench::config::DEFAULT_THREADS,
            length: race_bench::config::DEFAULT_RACE_LENGTH,
            max_delay: race_bench::config::DEFAULT_MAX_DELAY_UNITS,
            unit_micros: 1_000,
            seed: None,
            only: Vec::new(),
            format: ReportFormat::Text,
        }
    }
}

#[derive(Args, Debug)]
struct ApartmentArgs {
    #[arg(long, default_value_t = 50_000)]
    size: usize,
    #[arg(long, default_value_t = 4)]
    threads: usize,
    /// Maximum distance to the metro in kilometres.
    #[arg(long, default_value_t = 1.0)]
    max_distance: f64,
    /// Print only timings, not the matching listings.
    #[arg(long)]
    quiet: bool,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RwArgs {
    #[arg(long, default_value_t = 5)]
    readers: usize,
    #[arg(long, default_value_t = 5)]
    writers: usize,
    #[arg(long, default_value_t = 3)]
    rounds: usize,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Command::Race(RaceArgs::default())) {
        Command::Race(args) => run_race(args),
        Command::Apartments(args) => run_apartments(args),
        Command::ReadersWriters(args) => run_readers_writers(args),
    };
    if let Err(err) = result {
        log::error!("{err}");
        eprintln!("race-bench: {err}");
        std::process::exit(1);
    }
}

fn run_race(args: RaceArgs) -> Result<()> {
    let mut config = RaceConfig::default()
        .with_threads(args.threads)
        .with_race_length(args.length)
        .with_max_delay_units(args.max_delay)
        .with_delay_unit(Duration::from_micros(args.unit_micros));
    config.seed = args.seed;

    let mut driver = RaceDriver::new(config)?.format(args.format);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.only.is_empty() {
        driver.run_all(&mut out)?;
    } else {
        driver.run_selected(&args.only, &mut out)?;
    }
    Ok(())
}

fn run_apartments(args: ApartmentArgs) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let listings = apartments::generate(args.size, &mut rng);

    let start = Instant::now();
    let sequential = apartments::find_sequential(&listings, args.max_distance);
    let sequential_time = start.elapsed();

    let start = Instant::now();
    let parallel = apartments::find_parallel(&listings, args.max_distance, args.threads)?;
    let parallel_time = start.elapsed();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Results without concurrency:")?;
    if !args.quiet {
        for apartment in &sequential {
            writeln!(out, "{apartment}")?;
        }
    }
    writeln!(out, "\nElapsed time (sequential): {sequential_time:?}\n")?;
    writeln!(out, "Results with concurrency (using {} threads):", args.threads)?;
    if !args.quiet {
        for apartment in &parallel {
            writeln!(out, "{apartment}")?;
        }
    }
    writeln!(out, "\nElapsed time (parallel): {parallel_time:?}")?;
    Ok(())
}

fn run_readers_writers(args: RwArgs) -> Result<()> {
    let config = RwConfig {
        readers: args.readers,
        writers: args.writers,
        rounds: args.rounds,
        ..RwConfig::default()
    };
    let stdout = io::stdout();
    let outcome = readers_writers::run_with(&config, |event| {
        if let Err(err) = writeln!(stdout.lock(), "{event}") {
            log::warn!("event output failed: {err}");
        }
    })?;
    writeln!(stdout.lock(), "Final value: {}", outcome.final_value)?;
    Ok(())
}
