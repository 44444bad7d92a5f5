//! Run summaries and the append-only CSV results log.
//!
//! The log accumulates rows across sessions: existing lines are never rewritten, the
//! header is written once when the file is first created (or found empty), and each
//! summary is appended through its own open/write/flush/close cycle so a crash loses at
//! most the row being written.

use crate::{
    error::{BenchError, BenchErrorKind},
    matrix::MatrixInfo,
    stats::RunStatistics,
};
use serde::Serialize;
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
};

/// Column names of the results log, in order.
pub const LOG_HEADER: [&str; 12] = [
    "matrix",
    "dimensions",
    "type",
    "iter",
    "time_mean",
    "time_variance",
    "mem_mean",
    "mem_variance",
    "rel_error",
    "system",
    "language",
    "library",
];

/// Describes the machine and software stack a run was measured on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentLabel {
    pub system: String,
    pub language: String,
    pub library: String,
}

impl EnvironmentLabel {
    pub fn new(
        system: impl Into<String>,
        language: impl Into<String>,
        library: impl Into<String>,
    ) -> Self {
        Self {
            system: system.into(),
            language: language.into(),
            library: library.into(),
        }
    }
}

/// The aggregated result of benchmarking one matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub matrix_name: String,
    /// `"rows x cols"`.
    pub dimensions: String,
    pub category: String,
    pub iteration_count: usize,
    /// Seconds.
    pub time_mean: f64,
    pub time_variance: f64,
    /// Bytes; `None` unless every iteration produced a memory delta.
    pub memory_mean: Option<f64>,
    pub memory_variance: Option<f64>,
    pub error_mean: f64,
    pub environment: EnvironmentLabel,
}

impl RunSummary {
    pub fn new(
        info: &MatrixInfo,
        category: &str,
        stats: &RunStatistics,
        environment: &EnvironmentLabel,
    ) -> Self {
        Self {
            matrix_name: info.name.clone(),
            dimensions: info.dimensions(),
            category: category.to_string(),
            iteration_count: stats.iterations,
            time_mean: stats.time.mean,
            time_variance: stats.time.variance,
            memory_mean: stats.memory.map(|m| m.mean),
            memory_variance: stats.memory.map(|m| m.variance),
            error_mean: stats.error_mean,
            environment: environment.clone(),
        }
    }
}

/// One row of the results log. Field order must follow [`LOG_HEADER`].
#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    matrix: &'a str,
    dimensions: &'a str,
    #[serde(rename = "type")]
    category: &'a str,
    iter: usize,
    time_mean: f64,
    time_variance: f64,
    mem_mean: Option<f64>,
    mem_variance: Option<f64>,
    rel_error: f64,
    system: &'a str,
    language: &'a str,
    library: &'a str,
}

impl<'a> From<&'a RunSummary> for LogRecord<'a> {
    fn from(summary: &'a RunSummary) -> Self {
        Self {
            matrix: &summary.matrix_name,
            dimensions: &summary.dimensions,
            category: &summary.category,
            iter: summary.iteration_count,
            time_mean: summary.time_mean,
            time_variance: summary.time_variance,
            mem_mean: summary.memory_mean,
            mem_variance: summary.memory_variance,
            rel_error: summary.error_mean,
            system: &summary.environment.system,
            language: &summary.environment.language,
            library: &summary.environment.library,
        }
    }
}

fn log_write(e: impl Into<io::Error>) -> BenchError {
    BenchErrorKind::LogWrite(e.into()).into()
}

fn csv_error(e: csv::Error) -> io::Error {
    match e.into_kind() {
        csv::ErrorKind::Io(e) => e,
        other => io::Error::other(format!("{other:?}")),
    }
}

/// Append-only writer for the results log.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    /// Prepares the log at `path` for a new session, writing the header only when the
    /// file does not exist yet or is empty.
    ///
    /// # Errors
    /// [`BenchErrorKind::LogWrite`] if the file cannot be created or written.
    pub fn open_session(path: impl AsRef<Path>) -> Result<Self, BenchError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(log_write)?;

        if file.metadata().map_err(log_write)?.len() == 0 {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            writer.write_record(LOG_HEADER).map_err(|e| log_write(csv_error(e)))?;
            writer.flush().map_err(log_write)?;
            log::debug!("Created results log {}", path.display());
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one summary row and closes the file again.
    ///
    /// # Errors
    /// [`BenchErrorKind::LogWrite`] on any I/O failure.
    pub fn append(&self, summary: &RunSummary) -> Result<(), BenchError> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(log_write)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(LogRecord::from(summary))
            .map_err(|e| log_write(csv_error(e)))?;
        writer.flush().map_err(log_write)?;
        Ok(())
    }
}
