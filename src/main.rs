use std::{path::PathBuf, process::exit, thread, time::Duration};

use can_filter_calc::{
    config::{Algorithm, AnnealingSchedule, IdentifierSet},
    errors::{FilterCalcError, Result},
    input::{read_dbc_identifiers, read_identifiers, FrameFormat},
    report::{Report, ReportFormat},
    solver::{CancelToken, ExactSolver, FilterSolver, SimulatedAnnealing},
};
use clap::{ArgGroup, Parser};
use log::{error, info};
use rand::Rng;

/// Calculate CAN acceptance filters for a list of message identifiers.
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "dbc"])))]
struct Args {
    /// Text file with one hexadecimal CAN identifier per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// DBC database whose message identifiers are used
    #[arg(long)]
    dbc: Option<PathBuf>,

    /// Frame formats taken from the DBC database (any, standard, extended)
    #[arg(long, default_value = "any")]
    frames: FrameFormat,

    /// Bit size of the CAN identifiers
    #[arg(short, long)]
    size: u32,

    /// Number of filters
    #[arg(short, long)]
    num: usize,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Search algorithm (exact, sa, auto)
    #[arg(short, long, default_value = "exact")]
    algorithm: Algorithm,

    /// Report format (text, json)
    #[arg(long, default_value = "text")]
    format: ReportFormat,

    /// Seed of the annealing random generator, random if omitted
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = AnnealingSchedule::default().initial_temperature())]
    temperature: f64,

    #[arg(long, default_value_t = AnnealingSchedule::default().cooling_factor())]
    cooling: f64,

    /// Annealing iterations per epoch
    #[arg(long, default_value_t = AnnealingSchedule::default().iterations_per_epoch())]
    iterations: u64,

    #[arg(long, default_value_t = AnnealingSchedule::default().epochs())]
    epochs: u64,

    #[arg(long, default_value_t = AnnealingSchedule::DEFAULT_STEPS_PER_COOLING)]
    steps_per_cooling: u64,

    /// Stop the search after this many seconds and report the best result so far
    #[arg(long)]
    time_limit: Option<u64>,
}

fn run(args: Args) -> Result<()> {
    let ids = match (&args.file, &args.dbc) {
        (Some(path), _) => read_identifiers(path)?,
        (None, Some(path)) => read_dbc_identifiers(path, args.frames)?,
        (None, None) => {
            return Err(FilterCalcError::invalid_argument(
                "either --file or --dbc is required",
            ))
        }
    };
    let ids = IdentifierSet::new(ids, args.size)?;

    let cancel = CancelToken::new();
    if let Some(seconds) = args.time_limit {
        let timer = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            timer.cancel();
        });
    }

    let algorithm = args.algorithm.resolve(ids.len(), args.num);
    let mut solver: Box<dyn FilterSolver> = match algorithm {
        Algorithm::Annealing | Algorithm::Auto => {
            let schedule = AnnealingSchedule::new(
                args.temperature,
                args.cooling,
                args.iterations,
                args.epochs,
            )
            .with_steps_per_cooling(args.steps_per_cooling);
            let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
            info!("annealing seed {seed}");
            Box::new(SimulatedAnnealing::seeded(schedule, seed).with_cancel_token(cancel))
        }
        Algorithm::Exact => Box::new(ExactSolver::with_cancel_token(cancel)),
    };

    info!("solving with {}", solver.name());
    let solution = solver.solve(&ids, args.num)?;
    let report = Report::new(solution, algorithm);
    match &args.output {
        Some(path) => {
            report.write_to(path, args.format)?;
            info!("report written to {}", path.display());
        }
        None => print!("{}", report.render(args.format)?),
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{e}");
        exit(1);
    }
}
