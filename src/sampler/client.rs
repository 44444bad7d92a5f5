//! Blocking client for the memory sampler service.
//!
//! The client holds one persistent loopback connection so a reading costs a single
//! round trip. Any I/O failure drops the connection and is reported as
//! [`SamplerError::Unavailable`]; the next request tries to reconnect. Nothing is retried
//! within a request, so an unreachable service costs one refused connect per reading.

use super::{
    MemorySampler, SamplePoint, SamplerError,
    protocol::{SampleRequest, SampleResponse},
};
use std::{
    io::{self, BufRead, BufReader, Write},
    net::{SocketAddr, TcpStream},
    time::Duration,
};

/// Default connect/read/write timeout for a single reading.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Connection {
    fn open(addr: SocketAddr, timeout: Duration) -> io::Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    fn round_trip(&mut self, request: &str) -> Result<SampleResponse, SamplerError> {
        self.writer.write_all(request.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "sampler closed the connection",
            )
            .into());
        }
        SampleResponse::decode(&line)
    }
}

/// Client side of the sampler protocol.
pub struct SamplerClient {
    addr: SocketAddr,
    target_pid: u32,
    timeout: Duration,
    connection: Option<Connection>,
}

impl SamplerClient {
    /// Creates a client that measures the calling process. No connection is made until
    /// the first reading.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            target_pid: std::process::id(),
            timeout: DEFAULT_TIMEOUT,
            connection: None,
        }
    }

    /// Measures another process instead of the caller.
    pub fn with_target_pid(mut self, pid: u32) -> Self {
        self.target_pid = pid;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn target_pid(&self) -> u32 {
        self.target_pid
    }

    /// Sends one request and waits for the reading.
    pub fn request(&mut self, request: &SampleRequest) -> Result<u64, SamplerError> {
        let connection = match self.connection.as_mut() {
            Some(connection) => connection,
            None => self
                .connection
                .insert(Connection::open(self.addr, self.timeout)?),
        };

        match connection.round_trip(&request.encode()) {
            Ok(SampleResponse::Bytes(bytes)) => Ok(bytes),
            Ok(SampleResponse::Error(message)) => Err(SamplerError::Process(message)),
            Err(err) => {
                // The stream state is unknown after a failed exchange.
                self.connection = None;
                Err(err)
            }
        }
    }
}

impl MemorySampler for SamplerClient {
    fn sample(&mut self, point: &SamplePoint<'_>) -> Result<u64, SamplerError> {
        let request = SampleRequest {
            pid: self.target_pid,
            matrix: point.matrix.to_string(),
            iteration: point.iteration,
            phase: point.phase,
        };
        self.request(&request)
    }
}
