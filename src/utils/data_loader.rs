//! This module provides utilities for loading benchmark matrices from files.
//!
//! Matrices are read from the Matrix Market exchange format, in either of its two
//! variants: `coordinate` (sparse triplets) and `array` (dense, column-major). Both
//! variants are assembled into the same compressed sparse column structure, so callers
//! never need to know which one a file used. Symmetric and skew-symmetric files store a
//! single triangle; the missing half is mirrored in during assembly.

use crate::matrix::{Field, MatrixInfo, SparseMatrix, Symmetry};
use faer::sparse::{SparseColMat, Triplet};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};
use thiserror::Error;

/// Represents all possible errors that can occur during matrix loading and parsing.
#[derive(Error, Debug)]
pub enum MatrixLoadError {
    /// Wraps a standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file does not start with a `%%MatrixMarket` banner.
    #[error("Format error: the '%%MatrixMarket' banner line is missing.")]
    MissingHeader,
    /// The banner is present but names an unknown object, format, field or symmetry.
    #[error("Format error: invalid banner '{0}'.")]
    InvalidHeader(String),
    /// The matrix uses a scalar field the benchmark cannot solve over.
    #[error("Unsupported field '{0}': only real, integer and pattern matrices can be benchmarked.")]
    UnsupportedField(Field),
    /// The size line declares zero rows or columns.
    #[error("Format error: the matrix is empty ({rows} x {cols}).")]
    EmptyMatrix { rows: usize, cols: usize },
    /// The size line declares more rows or columns than can be assembled.
    #[error("Format error: the declared shape {rows} x {cols} exceeds the limit of {limit} rows or columns.")]
    DimensionTooLarge {
        rows: usize,
        cols: usize,
        limit: usize,
    },
    /// The size line after the comments is missing or malformed.
    #[error("Format error: the size line was not found or was malformed.")]
    MissingSizeLine,
    /// Occurs when a string cannot be parsed into an integer.
    #[error("Parse error: Failed to parse integer from '{0}'")]
    ParseInt(String),
    /// Occurs when a string cannot be parsed into a float.
    #[error("Parse error: Failed to parse float from '{0}'")]
    ParseFloat(String),
    /// A coordinate entry lies outside the declared shape.
    #[error("Entry ({row}, {col}) is outside the declared {rows} x {cols} shape.")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    /// The number of entries read does not match the size line.
    #[error("Entry count mismatch: expected {expected} entries, read {actual}.")]
    EntryCountMismatch { expected: usize, actual: usize },
    /// Occurs if the sparse matrix construction fails internally.
    #[error("Internal error: Failed to construct the sparse matrix from triplets.")]
    SparseMatrixConstructionError,
}

/// Largest row or column count accepted from a size line.
///
/// The assembled matrix and every benchmark vector scale with the dimension, so a corrupt
/// size line is rejected before anything is allocated for it.
pub const MAX_DIMENSION: usize = 1 << 27;

/// Cap on the capacity reserved up front from a declared entry count.
const RESERVE_HINT_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Coordinate,
    Array,
}

/// Parses the `%%MatrixMarket matrix <layout> <field> <symmetry>` banner.
fn parse_banner(line: &str) -> Result<(Layout, Field, Symmetry), MatrixLoadError> {
    let lowered = line.trim().to_ascii_lowercase();
    let parts: Vec<&str> = lowered.split_whitespace().collect();
    if parts.first() != Some(&"%%matrixmarket") {
        return Err(MatrixLoadError::MissingHeader);
    }
    if parts.len() != 5 || parts[1] != "matrix" {
        return Err(MatrixLoadError::InvalidHeader(line.trim().to_string()));
    }

    let layout = match parts[2] {
        "coordinate" => Layout::Coordinate,
        "array" => Layout::Array,
        _ => return Err(MatrixLoadError::InvalidHeader(line.trim().to_string())),
    };
    let field = match parts[3] {
        "real" | "double" => Field::Real,
        "integer" => Field::Integer,
        "pattern" => Field::Pattern,
        "complex" => Field::Complex,
        _ => return Err(MatrixLoadError::InvalidHeader(line.trim().to_string())),
    };
    let symmetry = match parts[4] {
        "general" => Symmetry::General,
        // For real data a hermitian matrix is simply symmetric.
        "symmetric" | "hermitian" => Symmetry::Symmetric,
        "skew-symmetric" => Symmetry::SkewSymmetric,
        _ => return Err(MatrixLoadError::InvalidHeader(line.trim().to_string())),
    };

    if field == Field::Complex {
        return Err(MatrixLoadError::UnsupportedField(field));
    }
    if layout == Layout::Array && field == Field::Pattern {
        return Err(MatrixLoadError::InvalidHeader(line.trim().to_string()));
    }

    Ok((layout, field, symmetry))
}

/// Number of values an `array` file must list for the given shape.
fn array_entry_count(rows: usize, cols: usize, symmetry: Symmetry) -> Option<usize> {
    match symmetry {
        Symmetry::General => rows.checked_mul(cols),
        Symmetry::Symmetric => rows.checked_mul(rows.checked_add(1)?).map(|p| p / 2),
        Symmetry::SkewSymmetric => rows.checked_mul(rows - 1).map(|p| p / 2),
    }
}

fn parse_index(token: &str) -> Result<usize, MatrixLoadError> {
    token
        .parse::<usize>()
        .map_err(|_| MatrixLoadError::ParseInt(token.to_string()))
}

fn parse_value(token: &str) -> Result<f64, MatrixLoadError> {
    token
        .parse::<f64>()
        .map_err(|_| MatrixLoadError::ParseFloat(token.to_string()))
}

/// Pushes `(row, col, val)` and, for a stored off-diagonal entry of a symmetric or
/// skew-symmetric matrix, its mirrored counterpart.
fn push_entry(
    triplets: &mut Vec<Triplet<usize, usize, f64>>,
    symmetry: Symmetry,
    row: usize,
    col: usize,
    val: f64,
) {
    triplets.push(Triplet { row, col, val });
    if row != col {
        match symmetry {
            Symmetry::General => {}
            Symmetry::Symmetric => triplets.push(Triplet {
                row: col,
                col: row,
                val,
            }),
            Symmetry::SkewSymmetric => triplets.push(Triplet {
                row: col,
                col: row,
                val: -val,
            }),
        }
    }
}

/// Reads a Matrix Market stream into a [`SparseMatrix`] named `name`.
///
/// # Arguments
/// * `reader`: A buffered reader positioned at the banner line.
/// * `name`: The name recorded in the matrix info (and later in the results log).
pub fn read_matrix_market<R: BufRead>(
    reader: R,
    name: &str,
) -> Result<SparseMatrix, MatrixLoadError> {
    let mut lines = reader.lines();

    let banner = lines.next().ok_or(MatrixLoadError::MissingHeader)??;
    let (layout, field, symmetry) = parse_banner(&banner)?;

    // Everything after the banner: comments and blank lines are skipped, the first
    // remaining line is the size line, the rest are entries.
    let mut data_lines = lines.filter(|line| match line {
        Ok(l) => {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('%')
        }
        Err(_) => true,
    });

    let size_line = data_lines.next().ok_or(MatrixLoadError::MissingSizeLine)??;
    let sizes: Vec<&str> = size_line.split_whitespace().collect();
    let expected_tokens = match layout {
        Layout::Coordinate => 3,
        Layout::Array => 2,
    };
    if sizes.len() != expected_tokens {
        return Err(MatrixLoadError::MissingSizeLine);
    }
    let rows = parse_index(sizes[0])?;
    let cols = parse_index(sizes[1])?;
    if rows == 0 || cols == 0 {
        return Err(MatrixLoadError::EmptyMatrix { rows, cols });
    }
    if rows.max(cols) > MAX_DIMENSION {
        return Err(MatrixLoadError::DimensionTooLarge {
            rows,
            cols,
            limit: MAX_DIMENSION,
        });
    }
    if symmetry != Symmetry::General && rows != cols {
        return Err(MatrixLoadError::InvalidHeader(format!(
            "{} (a {} matrix must be square, found {} x {})",
            banner.trim(),
            symmetry,
            rows,
            cols
        )));
    }

    let mut triplets: Vec<Triplet<usize, usize, f64>> = Vec::new();

    // Entries as listed in the file, before mirroring or dropping zeros.
    let file_entries = match layout {
        Layout::Coordinate => {
            let declared = parse_index(sizes[2])?;
            // The declared count is untrusted; beyond the hint the vector grows with the
            // entries actually read.
            let mirror = if symmetry == Symmetry::General { 1 } else { 2 };
            triplets.reserve(declared.min(RESERVE_HINT_LIMIT) * mirror);

            let mut read = 0;
            for line in data_lines {
                let line = line?;
                let parts: Vec<&str> = line.split_whitespace().collect();
                let min_tokens = if field == Field::Pattern { 2 } else { 3 };
                if parts.len() < min_tokens {
                    return Err(MatrixLoadError::ParseFloat(line.trim().to_string()));
                }

                // Matrix Market indices are 1-based.
                let row = parse_index(parts[0])?;
                let col = parse_index(parts[1])?;
                if row == 0 || col == 0 || row > rows || col > cols {
                    return Err(MatrixLoadError::IndexOutOfBounds {
                        row,
                        col,
                        rows,
                        cols,
                    });
                }
                let val = match field {
                    Field::Pattern => 1.0,
                    _ => parse_value(parts[2])?,
                };

                push_entry(&mut triplets, symmetry, row - 1, col - 1, val);
                read += 1;
            }

            if read != declared {
                return Err(MatrixLoadError::EntryCountMismatch {
                    expected: declared,
                    actual: read,
                });
            }
            read
        }
        Layout::Array => {
            let expected = array_entry_count(rows, cols, symmetry).ok_or(
                MatrixLoadError::DimensionTooLarge {
                    rows,
                    cols,
                    limit: MAX_DIMENSION,
                },
            )?;

            // Column-major; symmetric files hold the lower triangle including the
            // diagonal, skew-symmetric files the strict lower triangle. Positions are
            // walked in step with the values so nothing is sized from the header.
            let mut positions = (0..cols)
                .flat_map(move |j| (0..rows).map(move |i| (i, j)))
                .filter(move |&(i, j)| match symmetry {
                    Symmetry::General => true,
                    Symmetry::Symmetric => i >= j,
                    Symmetry::SkewSymmetric => i > j,
                });

            let mut read = 0;
            for line in data_lines {
                let line = line?;
                for token in line.split_whitespace() {
                    let val = parse_value(token)?;
                    read += 1;
                    // Dense input carries explicit zeros; the sparse structure does not.
                    // Surplus values are only counted for the mismatch error.
                    if let Some((row, col)) = positions.next()
                        && val != 0.0
                    {
                        push_entry(&mut triplets, symmetry, row, col, val);
                    }
                }
            }

            if read != expected {
                return Err(MatrixLoadError::EntryCountMismatch {
                    expected,
                    actual: read,
                });
            }
            read
        }
    };

    let a = SparseColMat::try_new_from_triplets(rows, cols, &triplets)
        .map_err(|_| MatrixLoadError::SparseMatrixConstructionError)?;

    Ok(SparseMatrix::new(
        a,
        MatrixInfo {
            name: name.to_string(),
            rows,
            cols,
            nnz: file_entries,
            symmetry,
            field,
        },
    ))
}

/// Loads a Matrix Market file, naming the matrix after the file stem.
///
/// # Arguments
/// * `path`: The path to the `.mtx` file.
///
/// # Returns
/// The assembled [`SparseMatrix`], or the first parse error encountered.
pub fn load_matrix_market(path: impl AsRef<Path>) -> Result<SparseMatrix, MatrixLoadError> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    let file = File::open(path)?;
    read_matrix_market(BufReader::new(file), &name)
}
