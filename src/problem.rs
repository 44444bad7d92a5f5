//! Reference problem construction.
//!
//! For a matrix `A` of size m×n the benchmark solves `A x = b` where the exact solution
//! is the all-ones vector `x_exact` of length n and `b = A x_exact`. Fixing `x_exact`
//! across every matrix makes the accuracy figures comparable between runs.

use crate::{
    error::{BenchError, BenchErrorKind},
    matrix::SparseMatrix,
};
use faer::Mat;

/// A benchmark problem: the matrix, its known exact solution and the derived right-hand side.
#[derive(Debug)]
pub struct Problem<'a> {
    a: &'a SparseMatrix,
    x_exact: Mat<f64>,
    b: Mat<f64>,
}

impl<'a> Problem<'a> {
    /// Builds the reference problem `b = A * ones(n)`.
    ///
    /// # Errors
    /// [`BenchErrorKind::DimensionMismatch`] if the assembled matrix does not have the
    /// shape its file declared.
    pub fn build(a: &'a SparseMatrix) -> Result<Self, BenchError> {
        let x_exact = Mat::<f64>::from_fn(a.ncols(), 1, |_, _| 1.0);
        Self::with_exact_solution(a, x_exact)
    }

    /// Builds a problem around a caller-chosen exact solution.
    pub fn with_exact_solution(a: &'a SparseMatrix, x_exact: Mat<f64>) -> Result<Self, BenchError> {
        let info = a.info();
        if a.nrows() != info.rows {
            return Err(BenchErrorKind::DimensionMismatch {
                matrix: info.name.clone(),
                expected: info.rows,
                actual: a.nrows(),
            }
            .into());
        }
        if a.ncols() != info.cols {
            return Err(BenchErrorKind::DimensionMismatch {
                matrix: info.name.clone(),
                expected: info.cols,
                actual: a.ncols(),
            }
            .into());
        }
        if x_exact.nrows() != a.ncols() || x_exact.ncols() != 1 {
            return Err(BenchErrorKind::DimensionMismatch {
                matrix: info.name.clone(),
                expected: a.ncols(),
                actual: x_exact.nrows(),
            }
            .into());
        }

        let b = a.as_faer() * &x_exact;
        debug_assert_eq!(b.nrows(), a.nrows());

        Ok(Self { a, x_exact, b })
    }

    pub fn matrix(&self) -> &SparseMatrix {
        self.a
    }

    pub fn x_exact(&self) -> &Mat<f64> {
        &self.x_exact
    }

    /// The right-hand side as an owned column, in the form the solvers consume.
    pub fn rhs(&self) -> &Mat<f64> {
        &self.b
    }
}
