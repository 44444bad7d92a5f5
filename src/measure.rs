//! The solve-and-measure loop.
//!
//! [`run_iterations`] solves the same [`Problem`] `N` times in a row. Each iteration is
//! bracketed as follows:
//!
//! 1. `start` memory reading (if a sampler is configured),
//! 2. timer start,
//! 3. `solver.solve(A, b)`,
//! 4. timer stop,
//! 5. `stop` memory reading,
//! 6. relative error of the returned vector.
//!
//! The sampler round trips sit outside the timed region, so sampler latency never shows
//! up in the timings. The loop returns the samples in iteration order; it keeps no state
//! between calls.

use crate::{
    error::{BenchError, BenchErrorKind},
    problem::Problem,
    sampler::{MemorySampler, Phase, SamplePoint},
    solvers::LinearSolver,
    utils::human::format_signed_bytes,
};
use faer::Mat;
use std::time::{Duration, Instant};

/// Number of timed solves per matrix unless configured otherwise.
pub const DEFAULT_ITERATIONS: usize = 30;

/// The measurements of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Wall-clock time of the solver call alone.
    pub elapsed: Duration,
    /// `stop - start` resident bytes; `None` when the sampler was absent or failed.
    pub memory_delta: Option<i64>,
    /// `‖x_exact − x‖₂ / ‖x‖₂`.
    pub relative_error: f64,
}

/// Norm-based relative error of a computed solution against the exact one.
pub fn relative_error(x_exact: &Mat<f64>, x_computed: &Mat<f64>) -> f64 {
    (x_exact - x_computed).norm_l2() / x_computed.norm_l2()
}

/// Signed difference of two absolute readings.
pub fn memory_delta(start: u64, stop: u64) -> i64 {
    // Two's complement wrap-around yields the exact signed difference for any
    // delta smaller than 2^63 bytes.
    stop.wrapping_sub(start) as i64
}

fn take_reading(
    sampler: Option<&mut (dyn MemorySampler + '_)>,
    point: SamplePoint<'_>,
) -> Option<u64> {
    let sampler = sampler?;
    match sampler.sample(&point) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!(
                "No memory reading for '{}' iteration {} ({}): {}",
                point.matrix,
                point.iteration,
                point.phase,
                e
            );
            None
        }
    }
}

/// Runs `iterations` timed solves of `problem` and returns one [`Sample`] per iteration.
///
/// # Arguments
/// * `problem`: The fixed `(A, b)` pair with its known solution.
/// * `solver`: The solver under test.
/// * `sampler`: Optional memory sampler; its failures only drop the memory delta.
/// * `iterations`: Number of solves, at least 1.
///
/// # Errors
/// The first failed iteration aborts the run: a solver error or a result of the wrong
/// length yields [`BenchErrorKind::SolverFailure`], a NaN or infinite relative error
/// yields [`BenchErrorKind::NonFiniteError`]. No partial samples are returned.
pub fn run_iterations(
    problem: &Problem<'_>,
    solver: &dyn LinearSolver,
    mut sampler: Option<&mut (dyn MemorySampler + '_)>,
    iterations: usize,
) -> Result<Vec<Sample>, BenchError> {
    if iterations == 0 {
        return Err(BenchErrorKind::InputError(
            "the iteration count must be at least 1".to_string(),
        )
        .into());
    }

    let a = problem.matrix();
    let name = a.name();
    let b = problem.rhs();
    let n = a.ncols();
    let mut samples = Vec::with_capacity(iterations);

    for iteration in 0..iterations {
        let point = |phase| SamplePoint {
            matrix: name,
            iteration,
            phase,
        };

        let start_bytes = take_reading(sampler.as_deref_mut(), point(Phase::Start));

        let start_time = Instant::now();
        let result = solver.solve(a, b);
        let elapsed = start_time.elapsed();

        // Without a start reading a stop reading is useless, so skip the round trip.
        let stop_bytes = match start_bytes {
            Some(_) => take_reading(sampler.as_deref_mut(), point(Phase::Stop)),
            None => None,
        };

        let x = result.map_err(|e| BenchErrorKind::SolverFailure {
            matrix: name.to_string(),
            iteration,
            reason: e.to_string(),
        })?;

        if x.nrows() != n || x.ncols() != 1 {
            return Err(BenchErrorKind::SolverFailure {
                matrix: name.to_string(),
                iteration,
                reason: format!(
                    "solver returned a {}x{} result, expected {}x1",
                    x.nrows(),
                    x.ncols(),
                    n
                ),
            }
            .into());
        }

        let rel_err = relative_error(problem.x_exact(), &x);
        if !rel_err.is_finite() {
            return Err(BenchErrorKind::NonFiniteError {
                matrix: name.to_string(),
                iteration,
                value: rel_err,
            }
            .into());
        }

        let memory_delta = start_bytes
            .zip(stop_bytes)
            .map(|(start, stop)| memory_delta(start, stop));

        log::debug!(
            "'{}' iteration {}/{}: {:.6}s, relative error {:.3e}, memory {}",
            name,
            iteration + 1,
            iterations,
            elapsed.as_secs_f64(),
            rel_err,
            memory_delta.map_or_else(|| "n/a".to_string(), format_signed_bytes)
        );

        samples.push(Sample {
            elapsed,
            memory_delta,
            relative_error: rel_err,
        });
    }

    Ok(samples)
}
