//! Benchmark runner.
//!
//! Benchmarks every `*.mtx` file of the given directories with one solver backend and
//! appends one row per matrix to the results log. Memory deltas are taken from a running
//! `memsampler` service when `--sampler` is given, or from the process itself with
//! `--in-process-memory`; without either, the memory columns stay empty.
//!
//! Per-matrix failures are logged and skipped. The process exits with an error only when
//! the results log cannot be written or no matrix directory is usable.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use spsolve_bench::{
    measure::DEFAULT_ITERATIONS,
    report::EnvironmentLabel,
    sampler::{InProcessSampler, MemorySampler, client::SamplerClient},
    session::{self, MatrixOutcome, SessionConfig},
    solvers::SolverBackend,
    utils::{human::format_bytes, perf::peak_resident_bytes},
};
use std::{net::SocketAddr, path::PathBuf};

/// Command-line arguments for the benchmark runner.
#[derive(Parser, Debug)]
#[clap(
    name = "spbench",
    about = "Times sparse direct solves over Matrix Market collections."
)]
struct Args {
    /// Directories whose `*.mtx` files are benchmarked.
    #[clap(required = true, value_name = "DIR")]
    matrix_dirs: Vec<PathBuf>,
    /// Category label for every matrix; defaults to each directory's name.
    #[clap(long)]
    category: Option<String>,
    /// Number of timed solves per matrix.
    #[clap(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    /// Solver backend under test.
    #[clap(long, value_enum, default_value_t = SolverBackend::Lu)]
    solver: SolverBackend,
    /// Address of a running `memsampler` service.
    #[clap(long, value_name = "ADDR", conflicts_with = "in_process_memory")]
    sampler: Option<SocketAddr>,
    /// Sample the resident memory of this process directly instead of via a service.
    #[clap(long)]
    in_process_memory: bool,
    /// Ask the sampler service about another process instead of this one.
    #[clap(long, requires = "sampler")]
    target_pid: Option<u32>,
    /// Path to the results CSV; rows are appended across sessions.
    #[clap(long, value_name = "PATH", default_value = "log.csv")]
    log: PathBuf,
    /// System label recorded with every row.
    #[clap(long, default_value = std::env::consts::OS)]
    system: String,
    /// Language label recorded with every row.
    #[clap(long, default_value = "Rust")]
    language: String,
    /// Library label recorded with every row; defaults to the solver backend's name.
    #[clap(long)]
    library: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    let args = Args::parse();
    if args.iterations == 0 {
        bail!("--iterations must be at least 1");
    }

    let solver = args.solver.solver();
    let library = args
        .library
        .clone()
        .unwrap_or_else(|| solver.name().to_string());
    let environment = EnvironmentLabel::new(args.system.clone(), args.language.clone(), library);

    let mut sources = Vec::new();
    for dir in &args.matrix_dirs {
        match session::discover_matrices(dir, args.category.as_deref()) {
            Ok(found) => sources.extend(found),
            Err(e) => log::error!("Skipping {}: {}", dir.display(), e),
        }
    }
    if sources.is_empty() {
        bail!("no matrices found in the given directories");
    }

    let mut client;
    let mut in_process;
    let sampler: Option<&mut dyn MemorySampler> = if let Some(addr) = args.sampler {
        client = SamplerClient::new(addr);
        if let Some(pid) = args.target_pid {
            client = client.with_target_pid(pid);
        }
        log::info!(
            "Memory readings from sampler at {} (pid {})",
            addr,
            client.target_pid()
        );
        Some(&mut client)
    } else if args.in_process_memory {
        in_process = InProcessSampler;
        log::info!("Memory readings taken in-process");
        Some(&mut in_process)
    } else {
        log::info!("No memory sampler configured; memory columns stay empty");
        None
    };

    let config = SessionConfig {
        iterations: args.iterations,
        log_path: args.log.clone(),
        environment,
    };

    let report = session::run_session(&config, &sources, solver.as_ref(), sampler)
        .with_context(|| format!("Benchmark session aborted ({})", args.log.display()))?;

    for outcome in &report.outcomes {
        if let MatrixOutcome::Failed { matrix, error } = outcome {
            log::warn!("{} failed: {}", matrix, error);
        }
    }
    log::info!(
        "{} of {} matrices benchmarked; results in {}.",
        report.completed(),
        report.outcomes.len(),
        args.log.display()
    );
    if let Some(peak) = peak_resident_bytes() {
        log::info!("Peak RSS {}", format_bytes(peak));
    }

    Ok(())
}
