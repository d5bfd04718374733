use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use transiro::{Catalog, ExternalSolver, Request, SolveOptions, Solver};

/// Computes the cheapest install/uninstall command sequence that takes the
/// initial state to one satisfying the constraints, and prints it as a
/// JSON array on stdout.
#[derive(Parser)]
#[clap(version, about)]
struct Opts {
    /// The catalog document: a JSON array of package records.
    catalog: PathBuf,

    /// The initial-state document: a JSON array of package references.
    initial: PathBuf,

    /// The constraints document: a JSON array of `+`/`-` prefixed
    /// references.
    constraints: PathBuf,

    /// The SAT solver command: DIMACS on stdin, `SAT <literals> 0` or
    /// anything else (unsatisfiable) on stdout.
    #[clap(long, env = "TRANSIRO_SAT_SOLVER")]
    sat_solver: String,

    /// Extra argument passed to the SAT solver, repeatable.
    #[clap(long = "sat-arg")]
    sat_args: Vec<String>,

    /// Catalogs holding more packages than this are solved in
    /// first-feasible mode instead of enumerating towards the optimum.
    #[clap(long, default_value_t = SolveOptions::default().optimize_threshold)]
    optimize_threshold: usize,

    /// Enumerate exhaustively regardless of catalog size.
    #[clap(long)]
    always_optimize: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(Opts::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: Opts) -> anyhow::Result<()> {
    let records = read_json(&opts.catalog).context("failed to read the catalog document")?;
    let initial: Vec<String> =
        read_json(&opts.initial).context("failed to read the initial-state document")?;
    let constraints: Vec<String> =
        read_json(&opts.constraints).context("failed to read the constraints document")?;

    let catalog = Catalog::from_records(records)?;
    let request = Request::parse(&catalog, &initial, &constraints)?;

    let mut oracle = ExternalSolver::new(&opts.sat_solver);
    for arg in &opts.sat_args {
        oracle = oracle.arg(arg);
    }

    let options = SolveOptions {
        optimize_threshold: opts.optimize_threshold,
        always_optimize: opts.always_optimize,
    };
    let transaction = Solver::with_options(oracle, options).solve(&catalog, &request)?;

    println!("{}", serde_json::to_string(&transaction.render(&catalog))?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = BufReader::new(File::open(path).with_context(|| format!("cannot open {}", path.display()))?);
    Ok(serde_json::from_reader(file)?)
}
