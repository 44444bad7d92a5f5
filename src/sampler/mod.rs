//! Memory sampling around each timed solve.
//!
//! The benchmark loop asks a [`MemorySampler`] for an absolute memory reading right
//! before starting the timer and right after stopping it; the difference is the
//! iteration's memory delta. Two samplers exist:
//!
//! - [`client::SamplerClient`] talks to the out-of-process [`service::SamplerService`]
//!   over loopback TCP using the line protocol in [`protocol`]. Because the observer is a
//!   separate process, it can watch a solver running in any process, and its own
//!   allocations never show up in the readings.
//! - [`InProcessSampler`] reads the calling process's own resident memory directly.
//!
//! A sampler failure is never fatal: the loop records the iteration without a memory
//! delta and carries on.

pub mod client;
pub mod protocol;
pub mod service;

use crate::utils::perf;
use std::{fmt, io};
use thiserror::Error;

/// Which side of the timed region a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Stop,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Stop => "stop",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a reading for correlation in the service's own logs.
#[derive(Debug, Clone, Copy)]
pub struct SamplePoint<'a> {
    pub matrix: &'a str,
    pub iteration: usize,
    pub phase: Phase,
}

/// Errors raised while taking a memory reading.
#[derive(Error, Debug)]
pub enum SamplerError {
    /// The service could not be reached or the connection broke.
    #[error("memory sampler unavailable: {0}")]
    Unavailable(#[from] io::Error),

    /// A request or response line could not be parsed.
    #[error("malformed sampler message: '{0}'")]
    Protocol(String),

    /// The service answered, but could not read the target process.
    #[error("sampler could not read process memory: {0}")]
    Process(String),
}

/// Produces absolute memory readings, in bytes.
pub trait MemorySampler {
    fn sample(&mut self, point: &SamplePoint<'_>) -> Result<u64, SamplerError>;
}

/// Reads the resident memory of the calling process without leaving it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessSampler;

impl MemorySampler for InProcessSampler {
    fn sample(&mut self, _point: &SamplePoint<'_>) -> Result<u64, SamplerError> {
        perf::current_resident_bytes().ok_or_else(|| {
            SamplerError::Process(format!(
                "resident memory of process {} is not readable",
                std::process::id()
            ))
        })
    }
}
