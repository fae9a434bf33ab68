//! Seat guests at tables by simulated annealing.
//!
//! # Usage
//!
//! ```bash
//! # Run until interrupted, reporting every second
//! seat-shuffle --guests guests.csv --prefs prefs.csv --tables 10,10,8
//!
//! # Reproducible five minute run on round tables
//! seat-shuffle --guests guests.csv --prefs prefs.csv --tables 8,8 \
//!     --layout round --seed 42 --duration 300
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use seat_shuffle::input::{parse_capacities, read_guests, read_preferences};
use seat_shuffle::{Annealer, Arrangement, Condition, Guest, Layout, Params, Render, Report, RoundTable, Stop, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayoutKind {
    /// Long tables with a left and a right side
    TwoSided,
    /// Guests around a circle
    Round,
}

#[derive(Parser, Debug)]
#[command(name = "seat-shuffle")]
#[command(about = "Assign guests to tables by simulated annealing")]
struct Args {
    /// CSV file of guest names, with an optional gender column
    #[arg(long)]
    guests: PathBuf,

    /// CSV file of preferences: name,name,score
    #[arg(long)]
    prefs: PathBuf,

    /// Comma-separated list of table sizes
    #[arg(long)]
    tables: String,

    /// Table layout
    #[arg(long, value_enum, default_value_t = LayoutKind::TwoSided)]
    layout: LayoutKind,

    /// Random seed (random if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop after this many iterations
    #[arg(long)]
    iterations: Option<u64>,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Initial temperature
    #[arg(long, default_value = "250")]
    temperature: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let guests = read_guests(open(&args.guests)?)
        .with_context(|| format!("reading guests from {}", args.guests.display()))?;
    let preferences = read_preferences(open(&args.prefs)?)
        .with_context(|| format!("reading preferences from {}", args.prefs.display()))?;
    preferences.check_guests(&guests)?;
    let capacities = parse_capacities(&args.tables)?;

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, guests = guests.len(), preferences = preferences.len(), tables = capacities.len(), "loaded");

    let params = Params::default().with_initial_temperature(args.temperature);
    let mut stop = Stop::never();
    if let Some(n) = args.iterations {
        stop = stop.with_max_iterations(n);
    }
    if let Some(secs) = args.duration {
        stop = stop.with_timeout(Duration::from_secs(secs));
    }

    let condition = Condition::new(preferences);
    let rng = SmallRng::seed_from_u64(seed);
    match args.layout {
        LayoutKind::TwoSided => anneal::<Table>(&guests, &capacities, &condition, params, &stop, rng),
        LayoutKind::Round => anneal::<RoundTable>(&guests, &capacities, &condition, params, &stop, rng),
    }
}

fn anneal<T: Layout + Render>(
    guests: &[Guest],
    capacities: &[usize],
    condition: &Condition,
    params: Params,
    stop: &Stop,
    mut rng: SmallRng,
) -> Result<()> {
    let arrangement = Arrangement::<T>::pack(guests, capacities, condition, &mut rng)?;
    let annealer = Annealer::new(arrangement, condition, params, rng)?;

    let outcome = annealer.run(stop, |state| {
        print!("{}", Report(&state.arrangement));
        println!("Iteration {}, temperature {:.1}\n\n", state.n_iterations, state.temperature);
    })?;

    print!("{}", Report(&outcome.best));
    println!("Best of {} iterations, final temperature {:.1}", outcome.iterations, outcome.temperature);
    Ok(())
}
