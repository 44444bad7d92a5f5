//! Summary statistics over the per-iteration samples.

use crate::measure::Sample;

/// Mean and unbiased (`n - 1`) variance of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub variance: f64,
}

/// Computes [`Moments`] with Welford's online update.
///
/// Returns `None` for an empty series. A single value has variance 0, and a constant
/// series yields exactly 0 rather than a tiny rounding residue.
pub fn moments(values: &[f64]) -> Option<Moments> {
    if values.is_empty() {
        return None;
    }

    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let delta = x - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (x - mean);
    }

    let n = values.len();
    let variance = if n > 1 { m2 / (n - 1) as f64 } else { 0.0 };
    Some(Moments { mean, variance })
}

/// Aggregated results of one matrix run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStatistics {
    pub iterations: usize,
    /// Solve time in seconds.
    pub time: Moments,
    /// Memory delta in bytes; present only when every iteration produced one.
    pub memory: Option<Moments>,
    /// Mean relative error.
    pub error_mean: f64,
}

impl RunStatistics {
    /// Aggregates the samples of one run. Returns `None` if `samples` is empty.
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let times: Vec<f64> = samples.iter().map(|s| s.elapsed.as_secs_f64()).collect();
        let time = moments(&times)?;

        let deltas: Option<Vec<f64>> = samples
            .iter()
            .map(|s| s.memory_delta.map(|d| d as f64))
            .collect();
        let memory = deltas.and_then(|d| moments(&d));

        let errors: Vec<f64> = samples.iter().map(|s| s.relative_error).collect();
        let error_mean = moments(&errors)?.mean;

        Some(Self {
            iterations: samples.len(),
            time,
            memory,
            error_mean,
        })
    }
}
