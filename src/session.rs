//! Benchmark session driver.
//!
//! A session walks every `*.mtx` file of the configured directories, and for each matrix
//! runs load, problem construction, the timed loop, aggregation and the log append in
//! that order. A failing matrix is reported and skipped; only a failure to write the
//! results log stops the session.

use crate::{
    error::{BenchError, BenchErrorKind},
    measure::{self, DEFAULT_ITERATIONS},
    problem::Problem,
    report::{EnvironmentLabel, LogSink, RunSummary},
    sampler::MemorySampler,
    solvers::LinearSolver,
    stats::RunStatistics,
    utils::{data_loader::load_matrix_market, human::format_signed_bytes},
};
use glob::glob;
use std::path::{Path, PathBuf};

/// A matrix file and the category label its results are filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixSource {
    pub path: PathBuf,
    pub category: String,
}

impl MatrixSource {
    /// The matrix name used in logs before the file is parsed.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Lists the `*.mtx` files of `dir` in sorted order.
///
/// The category is `category` if given, otherwise the directory's own name.
pub fn discover_matrices(
    dir: impl AsRef<Path>,
    category: Option<&str>,
) -> Result<Vec<MatrixSource>, BenchError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(BenchErrorKind::InputError(format!(
            "'{}' is not a directory",
            dir.display()
        ))
        .into());
    }

    let category = match category {
        Some(c) => c.to_string(),
        None => dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string()),
    };

    let pattern = dir.join("*.mtx");
    let entries = glob(&pattern.to_string_lossy())
        .map_err(|e| BenchErrorKind::InputError(format!("bad matrix pattern: {e}")))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        log::warn!("No .mtx files found in {}", dir.display());
    }

    Ok(paths
        .into_iter()
        .map(|path| MatrixSource {
            path,
            category: category.clone(),
        })
        .collect())
}

/// Session-wide settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub iterations: usize,
    pub log_path: PathBuf,
    pub environment: EnvironmentLabel,
}

impl SessionConfig {
    pub fn new(log_path: impl Into<PathBuf>, environment: EnvironmentLabel) -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            log_path: log_path.into(),
            environment,
        }
    }
}

/// What happened to one matrix.
#[derive(Debug)]
pub enum MatrixOutcome {
    Completed(RunSummary),
    Failed { matrix: String, error: BenchError },
}

/// Outcomes of every matrix, in the order they were run.
#[derive(Debug, Default)]
pub struct SessionReport {
    pub outcomes: Vec<MatrixOutcome>,
}

impl SessionReport {
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MatrixOutcome::Completed(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }

    pub fn summaries(&self) -> impl Iterator<Item = &RunSummary> {
        self.outcomes.iter().filter_map(|o| match o {
            MatrixOutcome::Completed(s) => Some(s),
            MatrixOutcome::Failed { .. } => None,
        })
    }
}

/// Loads, solves and aggregates one matrix without touching the log.
pub fn benchmark_matrix(
    source: &MatrixSource,
    solver: &dyn LinearSolver,
    sampler: Option<&mut (dyn MemorySampler + '_)>,
    iterations: usize,
    environment: &EnvironmentLabel,
) -> Result<RunSummary, BenchError> {
    let a = load_matrix_market(&source.path)?;
    let info = a.info();
    log::info!(
        "Loaded '{}' ({}, nnz {}, {} {})",
        info.name,
        info.dimensions(),
        info.nnz,
        info.field,
        info.symmetry
    );

    if !info.is_square() {
        return Err(BenchErrorKind::DimensionMismatch {
            matrix: info.name.clone(),
            expected: info.rows,
            actual: info.cols,
        }
        .into());
    }

    let problem = Problem::build(&a)?;
    let samples = measure::run_iterations(&problem, solver, sampler, iterations)?;
    let stats = RunStatistics::from_samples(&samples).ok_or_else(|| {
        BenchErrorKind::InputError(format!("no samples collected for '{}'", info.name))
    })?;

    Ok(RunSummary::new(info, &source.category, &stats, environment))
}

/// Runs every source in order, appending one log row per completed matrix.
///
/// # Errors
/// Only a [`BenchErrorKind::LogWrite`] failure aborts the session; every other error is
/// recorded as a [`MatrixOutcome::Failed`] and the next matrix is run.
pub fn run_session(
    config: &SessionConfig,
    sources: &[MatrixSource],
    solver: &dyn LinearSolver,
    mut sampler: Option<&mut (dyn MemorySampler + '_)>,
) -> Result<SessionReport, BenchError> {
    if config.iterations == 0 {
        return Err(BenchErrorKind::InputError(
            "the iteration count must be at least 1".to_string(),
        )
        .into());
    }

    let sink = LogSink::open_session(&config.log_path)?;
    log::info!(
        "Benchmarking {} matrices with '{}', {} iterations each, results in {}",
        sources.len(),
        solver.name(),
        config.iterations,
        sink.path().display()
    );

    let mut report = SessionReport::default();
    for (index, source) in sources.iter().enumerate() {
        log::info!(
            "[{}/{}] {} ({})",
            index + 1,
            sources.len(),
            source.path.display(),
            source.category
        );

        let result = benchmark_matrix(
            source,
            solver,
            sampler.as_deref_mut(),
            config.iterations,
            &config.environment,
        );

        match result {
            Ok(summary) => {
                sink.append(&summary)?;
                log::info!(
                    "'{}': time {:.6}s (var {:.3e}), memory {}, relative error {:.3e}",
                    summary.matrix_name,
                    summary.time_mean,
                    summary.time_variance,
                    summary
                        .memory_mean
                        .map_or_else(|| "n/a".to_string(), |m| format_signed_bytes(m as i64)),
                    summary.error_mean
                );
                report.outcomes.push(MatrixOutcome::Completed(summary));
            }
            Err(error) => {
                let matrix = source.name();
                log::error!("[{}] '{}': {}", error.kind_label(), matrix, error);
                report.outcomes.push(MatrixOutcome::Failed { matrix, error });
            }
        }
    }

    log::info!(
        "Session finished: {} completed, {} failed.",
        report.completed(),
        report.failed()
    );
    Ok(report)
}
