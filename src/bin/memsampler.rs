//! Out-of-process memory sampler.
//!
//! Listens on a loopback address and answers `{pid}|{matrix}|{iteration}|{phase}` requests
//! with the current resident memory of `pid`, in bytes. Start it before `spbench
//! --sampler <ADDR>` and stop it with Ctrl-C once the session is over.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use spsolve_bench::sampler::{protocol::DEFAULT_ADDR, service::SamplerService};
use std::{net::SocketAddr, path::PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "memsampler",
    about = "Serves process memory readings to the benchmark over loopback TCP."
)]
struct Args {
    /// Address to listen on.
    #[clap(long, value_name = "ADDR", default_value = DEFAULT_ADDR)]
    listen: SocketAddr,
    /// Also append every reading to this CSV file.
    #[clap(long, value_name = "PATH")]
    memory_log: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    let args = Args::parse();
    if !args.listen.ip().is_loopback() {
        log::warn!(
            "Listening on non-loopback address {}; any host able to connect can read process memory sizes",
            args.listen
        );
    }

    let mut service = SamplerService::bind(args.listen)
        .with_context(|| format!("Failed to bind memory sampler to {}", args.listen))?;
    if let Some(path) = &args.memory_log {
        service = service
            .with_memory_log(path)
            .with_context(|| format!("Failed to open memory log {}", path.display()))?;
        log::info!("Recording readings to {}", path.display());
    }

    service.serve().context("Memory sampler stopped unexpectedly")
}
