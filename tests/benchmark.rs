//! End-to-end tests of the benchmark loop, the results log and the session driver.

use anyhow::{Result, anyhow, ensure};
use spsolve_bench::{
    BenchErrorKind,
    measure::run_iterations,
    problem::Problem,
    report::{EnvironmentLabel, LOG_HEADER, LogSink},
    sampler::{MemorySampler, SamplePoint, SamplerError, client::SamplerClient},
    session::{self, MatrixOutcome, MatrixSource, SessionConfig},
    solvers::{SparseCholesky, SparseLu},
    stats::RunStatistics,
    utils::data_loader::read_matrix_market,
};
use std::{
    fs,
    io::Cursor,
    net::TcpListener,
    path::PathBuf,
    time::Duration,
};

/// The 4x4 SPD test system `cfd1`, lower triangle stored.
const CFD1: &str = "%%MatrixMarket matrix coordinate real symmetric
4 4 7
1 1 4.0
2 1 -1.0
2 2 4.0
3 2 -1.0
3 3 4.0
4 3 -1.0
4 4 4.0
";

const SINGULAR: &str = "%%MatrixMarket matrix coordinate real general
3 3 4
1 1 1.0
1 2 2.0
2 1 2.0
2 2 4.0
";

fn scratch_dir(tag: &str) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!(
        "spsolve_it_{}_{}",
        tag,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn env_label() -> EnvironmentLabel {
    EnvironmentLabel::new("linux", "Rust", "faer-lu")
}

/// Returns the readings it was constructed with, in order.
struct Scripted(Vec<u64>);

impl MemorySampler for Scripted {
    fn sample(&mut self, _point: &SamplePoint<'_>) -> Result<u64, SamplerError> {
        if self.0.is_empty() {
            return Err(SamplerError::Process("no more readings".to_string()));
        }
        Ok(self.0.remove(0))
    }
}

#[test]
fn test_cfd1_without_sampler() -> Result<()> {
    let a = read_matrix_market(Cursor::new(CFD1), "cfd1")?;
    let problem = Problem::build(&a)?;
    let samples = run_iterations(&problem, &SparseCholesky, None, 3)?;

    ensure!(samples.len() == 3);
    ensure!(samples.iter().all(|s| s.elapsed > Duration::ZERO));
    let stats = RunStatistics::from_samples(&samples).ok_or_else(|| anyhow!("no stats"))?;
    ensure!(stats.iterations == 3);
    ensure!(stats.time.mean >= 0.0 && stats.time.variance >= 0.0);
    ensure!(stats.error_mean < 1e-14, "error {}", stats.error_mean);
    ensure!(stats.memory.is_none());
    Ok(())
}

#[test]
fn test_unreachable_sampler_keeps_running() -> Result<()> {
    // Bind then drop to obtain a port nobody listens on.
    let addr = TcpListener::bind("127.0.0.1:0")?.local_addr()?;
    let mut client = SamplerClient::new(addr).with_timeout(Duration::from_millis(100));

    let a = read_matrix_market(Cursor::new(CFD1), "cfd1")?;
    let problem = Problem::build(&a)?;
    let samples = run_iterations(&problem, &SparseLu, Some(&mut client), 30)?;

    ensure!(samples.len() == 30);
    ensure!(samples.iter().all(|s| s.memory_delta.is_none()));
    let stats = RunStatistics::from_samples(&samples).ok_or_else(|| anyhow!("no stats"))?;
    ensure!(stats.memory.is_none());
    Ok(())
}

#[test]
fn test_negative_memory_delta_is_kept() -> Result<()> {
    let a = read_matrix_market(Cursor::new(CFD1), "cfd1")?;
    let problem = Problem::build(&a)?;
    let mut sampler = Scripted(vec![8192, 4096]);
    let samples = run_iterations(&problem, &SparseLu, Some(&mut sampler), 1)?;
    ensure!(samples[0].memory_delta == Some(-4096));

    let stats = RunStatistics::from_samples(&samples).ok_or_else(|| anyhow!("no stats"))?;
    let memory = stats.memory.ok_or_else(|| anyhow!("memory missing"))?;
    ensure!(memory.mean == -4096.0 && memory.variance == 0.0);
    Ok(())
}

#[test]
fn test_singular_matrix_fails_the_run() -> Result<()> {
    let a = read_matrix_market(Cursor::new(SINGULAR), "singular")?;
    let problem = Problem::build(&a)?;
    let err = run_iterations(&problem, &SparseLu, None, 5)
        .err()
        .ok_or_else(|| anyhow!("singular matrix produced samples"))?;
    ensure!(
        matches!(
            err.kind(),
            BenchErrorKind::SolverFailure { .. } | BenchErrorKind::NonFiniteError { .. }
        ),
        "unexpected error: {err}"
    );
    ensure!(!err.is_session_fatal());
    Ok(())
}

#[test]
fn test_log_preserves_previous_rows() -> Result<()> {
    let dir = scratch_dir("log")?;
    let log_path = dir.join("log.csv");
    let header = LOG_HEADER.join(",");
    fs::write(
        &log_path,
        format!("{header}\nold,2 x 2,def_pos,30,0.1,0.0,,,1e-16,linux,Rust,faer-lu\n"),
    )?;

    fs::write(dir.join("cfd1.mtx"), CFD1)?;
    let sources = session::discover_matrices(&dir, Some("def_pos"))?;
    let mut config = SessionConfig::new(&log_path, env_label());
    config.iterations = 3;

    let report = session::run_session(&config, &sources, &SparseLu, None)?;
    ensure!(report.completed() == 1 && report.failed() == 0);

    let text = fs::read_to_string(&log_path)?;
    let lines: Vec<&str> = text.lines().collect();
    ensure!(lines.len() == 3, "log:\n{text}");
    ensure!(lines[0] == header);
    ensure!(lines[1].starts_with("old,"));
    ensure!(lines[2].starts_with("cfd1,4 x 4,def_pos,3,"));
    ensure!(lines[2].ends_with(",linux,Rust,faer-lu"));
    ensure!(text.matches("matrix,dimensions").count() == 1);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_session_continues_after_bad_matrix() -> Result<()> {
    let dir = scratch_dir("session")?;
    fs::write(dir.join("a_broken.mtx"), "this is not a matrix\n")?;
    fs::write(dir.join("b_cfd1.mtx"), CFD1)?;
    fs::write(dir.join("c_singular.mtx"), SINGULAR)?;
    let log_path = dir.join("results.csv");

    let sources = session::discover_matrices(&dir, None)?;
    ensure!(sources.len() == 3);

    let mut config = SessionConfig::new(&log_path, env_label());
    config.iterations = 2;
    let mut sampler = Scripted(vec![100, 300, 300, 200]);
    let report = session::run_session(&config, &sources, &SparseLu, Some(&mut sampler))?;

    ensure!(report.completed() == 1);
    ensure!(report.failed() == 2);
    match &report.outcomes[0] {
        MatrixOutcome::Failed { matrix, error } => {
            ensure!(matrix == "a_broken");
            ensure!(matches!(error.kind(), BenchErrorKind::MatrixLoad(_)));
        }
        other => return Err(anyhow!("expected a load failure, got {other:?}")),
    }

    let summary = report
        .summaries()
        .next()
        .ok_or_else(|| anyhow!("no completed matrix"))?;
    ensure!(summary.matrix_name == "b_cfd1");
    ensure!(summary.memory_mean == Some(50.0));
    ensure!(summary.memory_variance == Some(45000.0));

    let text = fs::read_to_string(&log_path)?;
    ensure!(text.lines().count() == 2, "log:\n{text}");

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_unwritable_log_aborts_session() -> Result<()> {
    let dir = scratch_dir("abort")?;
    fs::write(dir.join("cfd1.mtx"), CFD1)?;
    let sources = vec![MatrixSource {
        path: dir.join("cfd1.mtx"),
        category: "def_pos".to_string(),
    }];
    // The log path is a directory, which cannot be appended to.
    let config = SessionConfig::new(&dir, env_label());

    let err = session::run_session(&config, &sources, &SparseLu, None)
        .err()
        .ok_or_else(|| anyhow!("session wrote to a directory"))?;
    ensure!(err.is_session_fatal());

    let sink = LogSink::open_session(dir.join("ok.csv"))?;
    ensure!(sink.path().ends_with("ok.csv"));
    fs::remove_dir_all(&dir)?;
    Ok(())
}
