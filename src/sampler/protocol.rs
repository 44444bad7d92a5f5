//! Line protocol spoken between the sampler client and service.
//!
//! A request is one line, `{pid}|{matrix}|{iteration}|{start|stop}`. The pid is the
//! process to measure; the other fields only serve the service's logging. Matrix names
//! may contain `|`, so the pid is split off the front and the phase and iteration off
//! the back.
//!
//! A response is one line holding either the resident byte count, or `ERR {message}`.

use super::{Phase, SamplerError};

/// Loopback endpoint used when none is configured.
pub const DEFAULT_ADDR: &str = "127.0.0.1:7878";

/// A single memory reading request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRequest {
    pub pid: u32,
    pub matrix: String,
    pub iteration: usize,
    pub phase: Phase,
}

impl SampleRequest {
    /// Encodes the request without the trailing newline.
    pub fn encode(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.pid, self.matrix, self.iteration, self.phase
        )
    }

    pub fn decode(line: &str) -> Result<Self, SamplerError> {
        let malformed = || SamplerError::Protocol(line.to_string());
        let line = line.trim_end_matches(['\r', '\n']);

        let (pid, rest) = line.split_once('|').ok_or_else(malformed)?;
        let mut tail = rest.rsplitn(3, '|');
        let phase = tail.next().ok_or_else(malformed)?;
        let iteration = tail.next().ok_or_else(malformed)?;
        let matrix = tail.next().ok_or_else(malformed)?;

        let phase = match phase {
            "start" => Phase::Start,
            "stop" => Phase::Stop,
            _ => return Err(malformed()),
        };

        Ok(Self {
            pid: pid.parse().map_err(|_| malformed())?,
            matrix: matrix.to_string(),
            iteration: iteration.parse().map_err(|_| malformed())?,
            phase,
        })
    }
}

/// The service's answer to a [`SampleRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleResponse {
    Bytes(u64),
    Error(String),
}

impl SampleResponse {
    pub fn encode(&self) -> String {
        match self {
            SampleResponse::Bytes(bytes) => bytes.to_string(),
            SampleResponse::Error(message) => format!("ERR {}", message.replace('\n', " ")),
        }
    }

    pub fn decode(line: &str) -> Result<Self, SamplerError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(message) = line.strip_prefix("ERR") {
            return Ok(SampleResponse::Error(message.trim_start().to_string()));
        }
        line.parse()
            .map(SampleResponse::Bytes)
            .map_err(|_| SamplerError::Protocol(line.to_string()))
    }
}
