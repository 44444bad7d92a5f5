//! Benchmark harness for sparse direct linear solvers.
//!
//! For every matrix in a collection of Matrix Market files the harness builds the
//! reference problem `A x = b` with `x_exact = ones(n)` and `b = A x_exact`, solves it
//! `N` times with a pluggable [`LinearSolver`], and records per iteration the wall-clock
//! solve time, the change in resident memory across the solve and the relative error
//! `‖x_exact − x‖ / ‖x‖`. The per-matrix means and variances are appended to a
//! CSV results log that accumulates across sessions.
//!
//! Built on [`faer`] for the sparse and dense factorizations.
//!
//! ## Memory sampling
//!
//! Memory is measured by an observer that can live in a separate process: the
//! `memsampler` binary runs a [`sampler::service::SamplerService`] on loopback, and the
//! benchmark asks it for a reading of its own pid right before and right after each
//! timed solve through a [`sampler::client::SamplerClient`]. An unreachable sampler only
//! removes the memory columns; it never stops a run.
//!
//! ## Example Usage
//!
//! ```rust
//! use faer::sparse::{SparseColMat, Triplet};
//! use spsolve_bench::{
//!     matrix::{Field, MatrixInfo, SparseMatrix, Symmetry},
//!     measure::run_iterations,
//!     problem::Problem,
//!     solvers::SparseCholesky,
//!     stats::RunStatistics,
//! };
//!
//! // 1D Laplacian, symmetric positive definite
//! let n = 4;
//! let mut triplets = Vec::new();
//! for i in 0..n {
//!     triplets.push(Triplet { row: i, col: i, val: 2.0 });
//!     if i + 1 < n {
//!         triplets.push(Triplet { row: i, col: i + 1, val: -1.0 });
//!         triplets.push(Triplet { row: i + 1, col: i, val: -1.0 });
//!     }
//! }
//! let nnz = triplets.len();
//! let a = SparseMatrix::new(
//!     SparseColMat::try_new_from_triplets(n, n, &triplets).unwrap(),
//!     MatrixInfo {
//!         name: "laplace".to_string(),
//!         rows: n,
//!         cols: n,
//!         nnz,
//!         symmetry: Symmetry::Symmetric,
//!         field: Field::Real,
//!     },
//! );
//!
//! let problem = Problem::build(&a).unwrap();
//! let samples = run_iterations(&problem, &SparseCholesky, None, 3).unwrap();
//! let stats = RunStatistics::from_samples(&samples).unwrap();
//!
//! assert_eq!(stats.iterations, 3);
//! assert!(stats.memory.is_none());
//! assert!(stats.error_mean < 1e-12);
//! ```

pub mod error;
pub mod matrix;
pub mod measure;
pub mod problem;
pub mod report;
pub mod sampler;
pub mod session;
pub mod solvers;
pub mod stats;
pub mod utils;

pub use error::{BenchError, BenchErrorKind};
pub use matrix::SparseMatrix;
pub use problem::Problem;
pub use solvers::{LinearSolver, SolverBackend};
