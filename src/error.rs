//! This module defines the custom error types for the library.
//!
//! Every fallible benchmark operation reports a [`BenchError`]. The public type is a thin
//! wrapper over [`BenchErrorKind`], so callers can both print a readable message and match
//! on the kind to decide whether a failure only costs one matrix or the whole session.
//!
//! Memory sampler failures are deliberately absent here: they never leave the sampler
//! client boundary and degrade to "memory not measured" (see [`crate::sampler`]).
use crate::utils::data_loader::MatrixLoadError;
use thiserror::Error;

/// Represents all possible errors that can occur while benchmarking a matrix.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct BenchError(#[from] BenchErrorKind);

/// The distinct kinds of benchmark errors.
#[derive(Error, Debug)]
pub enum BenchErrorKind {
    /// The matrix file could not be read or parsed.
    #[error("Failed to load matrix: {0}")]
    MatrixLoad(#[from] MatrixLoadError),

    /// The matrix and the vectors built for it disagree in size.
    #[error("Dimension mismatch for '{matrix}': expected {expected} entries, found {actual}.")]
    DimensionMismatch {
        matrix: String,
        expected: usize,
        actual: usize,
    },

    /// The external solver raised an error or returned an unusable result.
    #[error("Solver failure on '{matrix}' at iteration {iteration}: {reason}")]
    SolverFailure {
        matrix: String,
        iteration: usize,
        reason: String,
    },

    /// The relative error of a solve was NaN or infinite.
    #[error("Non-finite relative error on '{matrix}' at iteration {iteration}: {value}")]
    NonFiniteError {
        matrix: String,
        iteration: usize,
        value: f64,
    },

    /// The results log could not be created or appended to.
    #[error("Failed to write results log: {0}")]
    LogWrite(#[source] std::io::Error),

    /// Indicates that an invalid input parameter was provided to a function.
    #[error("Invalid input parameter: {0}")]
    InputError(String),
}

impl BenchError {
    /// Returns the underlying error kind.
    pub fn kind(&self) -> &BenchErrorKind {
        &self.0
    }

    /// Whether this error must abort the whole benchmark session.
    ///
    /// Only a broken results log qualifies: every other failure is confined to the
    /// matrix being benchmarked.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self.0, BenchErrorKind::LogWrite(_))
    }

    /// A short, stable label for the error kind, used in progress messages.
    pub fn kind_label(&self) -> &'static str {
        match self.0 {
            BenchErrorKind::MatrixLoad(_) => "MatrixLoadError",
            BenchErrorKind::DimensionMismatch { .. } => "DimensionMismatchError",
            BenchErrorKind::SolverFailure { .. } => "SolverFailureError",
            BenchErrorKind::NonFiniteError { .. } => "SolverFailureError",
            BenchErrorKind::LogWrite(_) => "LogWriteError",
            BenchErrorKind::InputError(_) => "InputError",
        }
    }
}

impl From<MatrixLoadError> for BenchError {
    fn from(err: MatrixLoadError) -> Self {
        BenchErrorKind::MatrixLoad(err).into()
    }
}
