//! The memory sampler service.
//!
//! A long-lived process listening on a loopback address. Each connection is served on its
//! own thread and may carry any number of requests; each request costs a single memory
//! reading of the requested pid, so the service adds well under a millisecond around a
//! solve. Optionally every reading is appended to a CSV memory log for later correlation
//! with the benchmark's own results.

use super::protocol::{SampleRequest, SampleResponse};
use crate::utils::{human::format_bytes, perf};
use serde::Serialize;
use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{SystemTime, UNIX_EPOCH},
};

/// Source of memory readings for the service.
pub trait MemoryProbe: Send + Sync {
    /// Resident bytes of `pid`, or `None` if the process cannot be read.
    fn resident_bytes(&self, pid: u32) -> Option<u64>;

    /// Virtual memory size of `pid` in bytes. Only consulted for the memory log.
    fn virtual_bytes(&self, _pid: u32) -> Option<u64> {
        None
    }
}

/// Reads real process memory through [`perf::resident_bytes`] and [`perf::virtual_bytes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl MemoryProbe for SystemProbe {
    fn resident_bytes(&self, pid: u32) -> Option<u64> {
        perf::resident_bytes(pid)
    }

    fn virtual_bytes(&self, pid: u32) -> Option<u64> {
        perf::virtual_bytes(pid)
    }
}

/// One row of the optional memory log.
#[derive(Debug, Serialize)]
struct MemoryLogRow<'a> {
    timestamp: f64,
    pid: u32,
    matrix: &'a str,
    iteration: usize,
    phase: &'static str,
    bytes: u64,
    virtual_bytes: Option<u64>,
}

type MemoryLog = Arc<Mutex<csv::Writer<File>>>;

/// A bound, not yet running, sampler service.
pub struct SamplerService {
    listener: TcpListener,
    probe: Arc<dyn MemoryProbe>,
    memory_log: Option<MemoryLog>,
    shutdown: Arc<AtomicBool>,
}

impl SamplerService {
    /// Binds the listening socket. Use port 0 to let the OS pick one.
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr)?,
            probe: Arc::new(SystemProbe),
            memory_log: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replaces the memory source.
    pub fn with_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Appends every reading to the CSV file at `path`, writing the header only when the
    /// file is new or empty.
    pub fn with_memory_log(mut self, path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        self.memory_log = Some(Arc::new(Mutex::new(writer)));
        Ok(self)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop on the calling thread until the service is shut down
    /// through a [`ServiceHandle`].
    pub fn serve(self) -> io::Result<()> {
        log::info!(
            "Memory sampler listening on {}",
            self.listener.local_addr()?
        );

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => {
                    let probe = Arc::clone(&self.probe);
                    let memory_log = self.memory_log.clone();
                    thread::spawn(move || {
                        let peer = stream.peer_addr().ok();
                        if let Err(e) = handle_connection(stream, probe.as_ref(), memory_log) {
                            log::warn!("Sampler connection {peer:?} ended with error: {e}");
                        }
                    });
                }
                Err(e) => log::warn!("Failed to accept sampler connection: {e}"),
            }
        }

        log::info!("Memory sampler stopped.");
        Ok(())
    }

    /// Runs the service on a background thread.
    pub fn spawn(self) -> io::Result<ServiceHandle> {
        let addr = self.local_addr()?;
        let shutdown = Arc::clone(&self.shutdown);
        let thread = thread::Builder::new()
            .name("memsampler".to_string())
            .spawn(move || self.serve())?;
        Ok(ServiceHandle {
            addr,
            shutdown,
            thread: Some(thread),
        })
    }
}

/// Controls a service started with [`SamplerService::spawn`]. Dropping the handle stops
/// the service.
pub struct ServiceHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<io::Result<()>>>,
}

impl ServiceHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    pub fn shutdown(mut self) -> io::Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> io::Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.shutdown.store(true, Ordering::SeqCst);
        // Wake the blocking accept so the loop observes the flag.
        let _ = TcpStream::connect(self.addr);
        thread
            .join()
            .map_err(|_| io::Error::other("memory sampler thread panicked"))?
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Failed to stop memory sampler: {e}");
        }
    }
}

fn handle_connection(
    stream: TcpStream,
    probe: &dyn MemoryProbe,
    memory_log: Option<MemoryLog>,
) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let response = answer(&line, probe, memory_log.as_ref());
        writer.write_all(response.encode().as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
}

/// Answers one request line.
fn answer(line: &str, probe: &dyn MemoryProbe, memory_log: Option<&MemoryLog>) -> SampleResponse {
    let request = match SampleRequest::decode(line) {
        Ok(request) => request,
        Err(e) => return SampleResponse::Error(e.to_string()),
    };

    let Some(bytes) = probe.resident_bytes(request.pid) else {
        log::warn!(
            "Process {} not readable ({} iteration {} {})",
            request.pid,
            request.matrix,
            request.iteration,
            request.phase
        );
        return SampleResponse::Error(format!("process {} not found", request.pid));
    };

    log::debug!(
        "pid {} | {} | iter {} | {} -> {}",
        request.pid,
        request.matrix,
        request.iteration,
        request.phase,
        format_bytes(bytes)
    );

    if let Some(memory_log) = memory_log {
        let virtual_bytes = probe.virtual_bytes(request.pid);
        record(memory_log, &request, bytes, virtual_bytes);
    }

    SampleResponse::Bytes(bytes)
}

fn record(memory_log: &MemoryLog, request: &SampleRequest, bytes: u64, virtual_bytes: Option<u64>) {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let row = MemoryLogRow {
        timestamp,
        pid: request.pid,
        matrix: &request.matrix,
        iteration: request.iteration,
        phase: request.phase.as_str(),
        bytes,
        virtual_bytes,
    };

    // A poisoned lock only means another connection panicked mid-write.
    let mut writer = memory_log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Err(e) = writer.serialize(&row) {
        log::warn!("Failed to append to memory log: {e}");
        return;
    }
    if let Err(e) = writer.flush() {
        log::warn!("Failed to flush memory log: {e}");
    }
}
