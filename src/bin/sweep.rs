use clap::Parser;
use solver_sweep_rs::config::SweepConfig;
use solver_sweep_rs::instance::ScratchPaths;
use solver_sweep_rs::logging::init_logging;
use solver_sweep_rs::sink::ResultSink;
use solver_sweep_rs::solver::SolverCommand;
use solver_sweep_rs::summary::print_sweep_summary;
use solver_sweep_rs::sweep::{Sweep, SweepOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Run a solver over every point of a parameter grid and collect one CSV row per trial.
#[derive(Debug, Parser)]
#[command(name = "sweep")]
struct Args {
    /// Sweep declaration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Output CSV, overrides `output` in the declaration
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Solver binary, overrides `solver_binary` in the declaration
    #[arg(long)]
    solver_binary: Option<PathBuf>,

    /// Directory for the instance/result exchange files
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Skip trials already recorded in the output
    #[arg(long)]
    resume: bool,

    /// Forward solver stdout/stderr
    #[arg(long)]
    show_solver_output: bool,

    /// Log level for the harness (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn run(args: Args) -> solver_sweep_rs::Result<()> {
    let mut config = SweepConfig::load(&args.config)?;
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(binary) = args.solver_binary {
        config.solver_binary = binary;
    }
    if let Some(dir) = args.scratch_dir {
        config.scratch_dir = dir;
    }

    let experiment = config.experiment()?;
    let solver = SolverCommand::new(&config.solver_binary).show_output(args.show_solver_output);
    tracing::info!(
        "{} sweep: {} trials, solver {}, output {}",
        experiment.kind(),
        experiment.len(),
        solver.binary().display(),
        config.output.display()
    );

    let options = SweepOptions {
        resume: args.resume,
        kill_grace: config.kill_grace(),
        log_short: config.log_short,
    };
    let sweep = Sweep::new(&experiment, &solver, ScratchPaths::in_dir(&config.scratch_dir), options)?;

    let mut sink = ResultSink::open(&config.output, experiment.header())?;
    let summary = sweep.run(&mut sink)?;

    print_sweep_summary(&summary);
    println!("results: {}", sink.path().display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
