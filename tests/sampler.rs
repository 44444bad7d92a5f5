//! Integration tests for the sampler client and service over loopback TCP.

use anyhow::{Result, anyhow, ensure};
use spsolve_bench::{
    measure::run_iterations,
    problem::Problem,
    sampler::{
        MemorySampler, Phase, SamplePoint, SamplerError,
        client::SamplerClient,
        protocol::SampleRequest,
        service::{MemoryProbe, SamplerService},
    },
    solvers::SparseLu,
    utils::data_loader::read_matrix_market,
};
use std::{
    fs,
    io::Cursor,
    sync::Mutex,
};

/// Answers with a fixed sequence of readings for pid 1, and nothing for other pids.
/// The virtual size of pid 1 is always 1 GiB.
struct SequenceProbe {
    readings: Mutex<Vec<u64>>,
}

impl SequenceProbe {
    fn new(readings: &[u64]) -> Self {
        Self {
            readings: Mutex::new(readings.iter().rev().copied().collect()),
        }
    }
}

impl MemoryProbe for SequenceProbe {
    fn resident_bytes(&self, pid: u32) -> Option<u64> {
        if pid != 1 {
            return None;
        }
        self.readings.lock().ok()?.pop()
    }

    fn virtual_bytes(&self, pid: u32) -> Option<u64> {
        (pid == 1).then_some(1 << 30)
    }
}

fn point(iteration: usize, phase: Phase) -> SamplePoint<'static> {
    SamplePoint {
        matrix: "cfd1",
        iteration,
        phase,
    }
}

#[test]
fn test_exact_negative_delta_over_the_wire() -> Result<()> {
    let service = SamplerService::bind("127.0.0.1:0")?
        .with_probe(SequenceProbe::new(&[10_000_000, 9_000_000]));
    let handle = service.spawn()?;

    let mut client = SamplerClient::new(handle.addr()).with_target_pid(1);
    let start = client.sample(&point(0, Phase::Start))?;
    let stop = client.sample(&point(0, Phase::Stop))?;
    ensure!(start == 10_000_000 && stop == 9_000_000);
    ensure!(spsolve_bench::measure::memory_delta(start, stop) == -1_000_000);

    handle.shutdown()?;
    Ok(())
}

#[test]
fn test_unknown_pid_is_a_process_error() -> Result<()> {
    let service = SamplerService::bind("127.0.0.1:0")?.with_probe(SequenceProbe::new(&[1]));
    let handle = service.spawn()?;

    let mut client = SamplerClient::new(handle.addr()).with_target_pid(999);
    match client.sample(&point(0, Phase::Start)) {
        Err(SamplerError::Process(message)) => ensure!(message.contains("999")),
        other => return Err(anyhow!("expected a process error, got {other:?}")),
    }
    // The connection survives an ERR answer.
    let request = SampleRequest {
        pid: 1,
        matrix: "cfd1".to_string(),
        iteration: 0,
        phase: Phase::Start,
    };
    ensure!(client.request(&request)? == 1);
    Ok(())
}

#[test]
fn test_real_service_measures_this_process() -> Result<()> {
    let handle = SamplerService::bind("127.0.0.1:0")?.spawn()?;
    let mut client = SamplerClient::new(handle.addr());

    let a = read_matrix_market(
        Cursor::new("%%MatrixMarket matrix coordinate real general\n2 2 2\n1 1 2.0\n2 2 3.0\n"),
        "diag2",
    )?;
    let problem = Problem::build(&a)?;
    let samples = run_iterations(&problem, &SparseLu, Some(&mut client), 4)?;

    ensure!(samples.len() == 4);
    ensure!(
        samples.iter().all(|s| s.memory_delta.is_some()),
        "service did not answer every reading"
    );
    Ok(())
}

#[test]
fn test_memory_log_records_every_reading() -> Result<()> {
    let path = std::env::temp_dir().join(format!("spsolve_memlog_{}.csv", std::process::id()));
    let _ = fs::remove_file(&path);

    let service = SamplerService::bind("127.0.0.1:0")?
        .with_probe(SequenceProbe::new(&[4096, 8192]))
        .with_memory_log(&path)?;
    let handle = service.spawn()?;

    let mut client = SamplerClient::new(handle.addr()).with_target_pid(1);
    client.sample(&point(3, Phase::Start))?;
    client.sample(&point(3, Phase::Stop))?;
    handle.shutdown()?;

    let text = fs::read_to_string(&path)?;
    let lines: Vec<&str> = text.lines().collect();
    ensure!(lines.len() == 3, "memory log:\n{text}");
    ensure!(lines[0] == "timestamp,pid,matrix,iteration,phase,bytes,virtual_bytes");
    ensure!(lines[1].ends_with(",1,cfd1,3,start,4096,1073741824"));
    ensure!(lines[2].ends_with(",1,cfd1,3,stop,8192,1073741824"));

    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn test_memory_log_virtual_column_is_empty_without_reading() -> Result<()> {
    struct ResidentOnly;

    impl MemoryProbe for ResidentOnly {
        fn resident_bytes(&self, _pid: u32) -> Option<u64> {
            Some(2048)
        }
    }

    let path = std::env::temp_dir().join(format!("spsolve_memlog_rss_{}.csv", std::process::id()));
    let _ = fs::remove_file(&path);

    let handle = SamplerService::bind("127.0.0.1:0")?
        .with_probe(ResidentOnly)
        .with_memory_log(&path)?
        .spawn()?;
    let mut client = SamplerClient::new(handle.addr()).with_target_pid(5);
    ensure!(client.sample(&point(0, Phase::Start))? == 2048);
    handle.shutdown()?;

    let text = fs::read_to_string(&path)?;
    let lines: Vec<&str> = text.lines().collect();
    ensure!(lines.len() == 2, "memory log:\n{text}");
    ensure!(lines[1].ends_with(",5,cfd1,0,start,2048,"));

    fs::remove_file(&path)?;
    Ok(())
}
