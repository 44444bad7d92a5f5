//! This module provides the solver seam of the benchmark.
//!
//! The harness never factorizes anything itself: it hands `(A, b)` to a [`LinearSolver`]
//! and times the call. Three `faer` backends are provided, matching the kinds of library
//! a direct-solve benchmark usually compares:
//!
//! - [`SparseLu`]: sparse LU with fill-reducing ordering, for general square matrices.
//! - [`SparseCholesky`]: sparse LLᵀ, for symmetric positive-definite matrices only.
//! - [`DenseLu`]: densifies `A` and runs partial-pivot LU; a fallback and a baseline.
//!
//! Any closure `Fn(&SparseMatrix, &Mat<f64>) -> Result<Mat<f64>, SolverError>` is also a
//! solver, which is how custom or instrumented solvers are plugged in.

use crate::matrix::SparseMatrix;
use faer::{Side, prelude::*};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a solver backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Direct solvers need a square system.
    #[error("matrix is not square ({rows} x {cols})")]
    NotSquare { rows: usize, cols: usize },

    /// The factorization was rejected by the backend (singular, not SPD, ...).
    #[error("factorization failed: {0}")]
    Factorization(String),
}

/// The capability "solve a sparse linear system and return a dense vector".
pub trait LinearSolver {
    /// A short backend name, recorded as the `library` label of a run by default.
    fn name(&self) -> &str;

    /// Solves `A x = b` and returns `x` as an n×1 column.
    fn solve(&self, a: &SparseMatrix, b: &Mat<f64>) -> Result<Mat<f64>, SolverError>;
}

impl<F> LinearSolver for F
where
    F: Fn(&SparseMatrix, &Mat<f64>) -> Result<Mat<f64>, SolverError>,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn solve(&self, a: &SparseMatrix, b: &Mat<f64>) -> Result<Mat<f64>, SolverError> {
        self(a, b)
    }
}

fn ensure_square(a: &SparseMatrix) -> Result<(), SolverError> {
    if a.nrows() != a.ncols() {
        return Err(SolverError::NotSquare {
            rows: a.nrows(),
            cols: a.ncols(),
        });
    }
    Ok(())
}

/// Sparse LU factorization followed by a triangular solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseLu;

impl LinearSolver for SparseLu {
    fn name(&self) -> &str {
        "faer-lu"
    }

    fn solve(&self, a: &SparseMatrix, b: &Mat<f64>) -> Result<Mat<f64>, SolverError> {
        ensure_square(a)?;
        let lu = a
            .as_faer()
            .as_ref()
            .sp_lu()
            .map_err(|e| SolverError::Factorization(format!("{e:?}")))?;
        Ok(lu.solve(b.as_ref()))
    }
}

/// Sparse Cholesky factorization; fails on matrices that are not positive definite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseCholesky;

impl LinearSolver for SparseCholesky {
    fn name(&self) -> &str {
        "faer-cholesky"
    }

    fn solve(&self, a: &SparseMatrix, b: &Mat<f64>) -> Result<Mat<f64>, SolverError> {
        ensure_square(a)?;
        // Only the lower triangle is read; the loader stores both halves.
        let llt = a
            .as_faer()
            .as_ref()
            .sp_cholesky(Side::Lower)
            .map_err(|e| SolverError::Factorization(format!("{e:?}")))?;
        Ok(llt.solve(b.as_ref()))
    }
}

/// Dense partial-pivot LU on a densified copy of `A`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLu;

impl LinearSolver for DenseLu {
    fn name(&self) -> &str {
        "faer-dense-lu"
    }

    fn solve(&self, a: &SparseMatrix, b: &Mat<f64>) -> Result<Mat<f64>, SolverError> {
        ensure_square(a)?;
        let mut dense = Mat::<f64>::zeros(a.nrows(), a.ncols());
        for triplet in a.as_faer().triplet_iter() {
            dense.as_mut()[(triplet.row, triplet.col)] += *triplet.val;
        }
        Ok(dense.as_ref().partial_piv_lu().solve(b))
    }
}

/// Selects one of the built-in solver backends.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SolverBackend {
    #[default]
    Lu,
    Cholesky,
    Dense,
}

impl SolverBackend {
    /// Instantiates the backend.
    pub fn solver(self) -> Box<dyn LinearSolver> {
        match self {
            SolverBackend::Lu => Box::new(SparseLu),
            SolverBackend::Cholesky => Box::new(SparseCholesky),
            SolverBackend::Dense => Box::new(DenseLu),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{Field, MatrixInfo, Symmetry};
    use faer::sparse::{SparseColMat, Triplet};

    /// The 1D Laplacian `tridiag(-1, 2, -1)`, symmetric positive definite.
    fn laplacian(n: usize) -> SparseMatrix {
        let mut triplets = Vec::with_capacity(3 * n - 2);
        for i in 0..n {
            triplets.push(Triplet { row: i, col: i, val: 2.0 });
            if i + 1 < n {
                triplets.push(Triplet { row: i, col: i + 1, val: -1.0 });
                triplets.push(Triplet { row: i + 1, col: i, val: -1.0 });
            }
        }
        let nnz = triplets.len();
        let a = SparseColMat::try_new_from_triplets(n, n, &triplets).unwrap();
        SparseMatrix::new(
            a,
            MatrixInfo {
                name: "laplace1d".to_string(),
                rows: n,
                cols: n,
                nnz,
                symmetry: Symmetry::Symmetric,
                field: Field::Real,
            },
        )
    }

    #[test]
    fn test_backends_agree_on_spd_system() {
        let a = laplacian(20);
        let x_true = Mat::<f64>::from_fn(20, 1, |i, _| (i + 1) as f64);
        let b = a.as_faer() * &x_true;

        for backend in [SolverBackend::Lu, SolverBackend::Cholesky, SolverBackend::Dense] {
            let solver = backend.solver();
            let x = solver.solve(&a, &b).unwrap();
            let rel_err = (&x - &x_true).norm_l2() / x_true.norm_l2();
            assert!(rel_err < 1e-12, "{} error too high: {}", solver.name(), rel_err);
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let triplets = [
            Triplet { row: 0, col: 0, val: -1.0 },
            Triplet { row: 1, col: 1, val: 1.0 },
        ];
        let a = SparseMatrix::new(
            SparseColMat::try_new_from_triplets(2, 2, &triplets).unwrap(),
            MatrixInfo {
                name: "indefinite".to_string(),
                rows: 2,
                cols: 2,
                nnz: 2,
                symmetry: Symmetry::Symmetric,
                field: Field::Real,
            },
        );
        let b = Mat::<f64>::from_fn(2, 1, |_, _| 1.0);
        assert!(matches!(
            SparseCholesky.solve(&a, &b),
            Err(SolverError::Factorization(_))
        ));
    }

    #[test]
    fn test_non_square_is_rejected() {
        let a = SparseMatrix::new(
            SparseColMat::try_new_from_triplets(2, 3, &[Triplet { row: 0, col: 0, val: 1.0 }])
                .unwrap(),
            MatrixInfo {
                name: "wide".to_string(),
                rows: 2,
                cols: 3,
                nnz: 1,
                symmetry: Symmetry::General,
                field: Field::Real,
            },
        );
        let b = Mat::<f64>::zeros(2, 1);
        assert_eq!(
            SparseLu.solve(&a, &b),
            Err(SolverError::NotSquare { rows: 2, cols: 3 })
        );
    }

    #[test]
    fn test_closure_is_a_solver() {
        let a = laplacian(3);
        let echo = |_: &SparseMatrix, b: &Mat<f64>| -> Result<Mat<f64>, SolverError> { Ok(b.clone()) };
        let b = Mat::<f64>::from_fn(3, 1, |i, _| i as f64);
        assert_eq!(echo.name(), "custom");
        assert_eq!(LinearSolver::solve(&echo, &a, &b).unwrap(), b);
    }
}
