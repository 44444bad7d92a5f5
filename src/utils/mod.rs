//! Common utilities for matrix loading and memory measurement.
//!
//! - **`data_loader`**: parses Matrix Market files (coordinate and array variants) into
//!   the crate's [`crate::matrix::SparseMatrix`] handle.
//!
//! - **`perf`**: platform-specific process memory readings, used by the memory sampler
//!   service and the in-process sampler.
//!
//! - **`human`**: byte-count formatting for progress messages.

pub mod data_loader;
pub mod human;
pub mod perf;
