//! This module defines the matrix handle shared by every benchmark stage.
//!
//! A [`SparseMatrix`] couples the assembled `faer` sparse matrix with the structural
//! properties declared by its source file ([`MatrixInfo`]). It is produced once by the
//! loader and only read afterwards: the problem builder, the solvers and the log sink
//! all borrow it.

use faer::sparse::SparseColMat;
use std::fmt;

/// Storage representation declared by a Matrix Market banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    /// Every entry is stored explicitly.
    General,
    /// Only one triangle is stored; `a_ij = a_ji`. Hermitian real input maps here.
    Symmetric,
    /// Only the strict lower triangle is stored; `a_ij = -a_ji`.
    SkewSymmetric,
}

impl fmt::Display for Symmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Symmetry::General => "general",
            Symmetry::Symmetric => "symmetric",
            Symmetry::SkewSymmetric => "skew-symmetric",
        };
        f.write_str(label)
    }
}

/// Scalar field declared by a Matrix Market banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Real,
    Integer,
    /// Structure only; every stored entry has the value `1.0`.
    Pattern,
    Complex,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Field::Real => "real",
            Field::Integer => "integer",
            Field::Pattern => "pattern",
            Field::Complex => "complex",
        };
        f.write_str(label)
    }
}

/// Structural properties of a loaded matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixInfo {
    /// The matrix name, usually the file stem (e.g. `cfd1`).
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    /// Number of entries declared in the file, before symmetric expansion. See
    /// [`SparseMatrix::stored_nnz`] for the assembled count.
    pub nnz: usize,
    pub symmetry: Symmetry,
    pub field: Field,
}

impl MatrixInfo {
    /// The `"rows x cols"` label written to the results log.
    pub fn dimensions(&self) -> String {
        format!("{} x {}", self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }
}

/// A read-only sparse matrix together with its declared properties.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    a: SparseColMat<usize, f64>,
    info: MatrixInfo,
}

impl SparseMatrix {
    /// Wraps an assembled matrix. The declared shape in `info` is checked later by the
    /// problem builder, not here, so that a mismatch surfaces as a benchmark error.
    pub fn new(a: SparseColMat<usize, f64>, info: MatrixInfo) -> Self {
        Self { a, info }
    }

    /// The assembled matrix in compressed sparse column form.
    pub fn as_faer(&self) -> &SparseColMat<usize, f64> {
        &self.a
    }

    pub fn info(&self) -> &MatrixInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn nrows(&self) -> usize {
        self.a.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.a.ncols()
    }

    /// Number of entries held by the assembled matrix, after mirroring and after
    /// duplicates were summed.
    pub fn stored_nnz(&self) -> usize {
        self.a.as_ref().compute_nnz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::sparse::Triplet;

    fn info(rows: usize, cols: usize) -> MatrixInfo {
        MatrixInfo {
            name: "tiny".to_string(),
            rows,
            cols,
            nnz: 2,
            symmetry: Symmetry::General,
            field: Field::Real,
        }
    }

    #[test]
    fn test_dimensions_label() {
        assert_eq!(info(70656, 70656).dimensions(), "70656 x 70656");
        assert!(info(3, 3).is_square());
        assert!(!info(3, 2).is_square());
    }

    #[test]
    fn test_handle_reports_stored_shape() {
        let triplets = [
            Triplet { row: 0, col: 0, val: 1.0 },
            Triplet { row: 1, col: 1, val: 2.0 },
        ];
        let a = SparseColMat::try_new_from_triplets(2, 2, &triplets).unwrap();
        let matrix = SparseMatrix::new(a, info(2, 2));
        assert_eq!(matrix.nrows(), 2);
        assert_eq!(matrix.ncols(), 2);
        assert_eq!(matrix.name(), "tiny");
        assert_eq!(matrix.stored_nnz(), 2);
        assert_eq!(Symmetry::SkewSymmetric.to_string(), "skew-symmetric");
        assert_eq!(Field::Pattern.to_string(), "pattern");
    }
}
