// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use task_farm_command_line::{CommandExecutor, CommandOutcome, CommandTask};
use task_farm_core::{framework, logging, FarmConfig, FrameworkOutcome};
use task_farm_dir_listing::DirListingSource;
use task_farm_process_tcp::{Launcher, TcpCluster};
use tracing::{error, info};

const DEFAULT_LOG_FILE: &str = "task_farm.log";

/// Lists directories on a pool of worker processes.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// JSON file with pacing and logging settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of worker processes to start
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Deadline for each `ls`, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Chance that the controller is asked to wait before each directory
    #[arg(long, default_value_t = 0.4)]
    defer_probability: f64,

    /// Directories to list
    #[arg(default_value = "/")]
    dirs: Vec<String>,
}

fn load_config(args: &Args) -> Result<FarmConfig> {
    let mut config = match &args.config {
        Some(path) => FarmConfig::load(path)?,
        None => FarmConfig::default(),
    };
    if config.log.file.is_none() {
        config.log.file = Some(PathBuf::from(DEFAULT_LOG_FILE));
    }
    Ok(config)
}

async fn launch(args: &Args) -> Result<()> {
    let program = std::env::current_exe().context("cannot locate own executable")?;
    let addr = Launcher::free_local_addr().context("no free local port")?;
    Launcher::new(program, args.workers, addr)
        .args(std::env::args_os().skip(1))
        .run()
        .await
        .context("run failed")
}

async fn take_part(
    cluster: TcpCluster<CommandTask, CommandOutcome>,
    args: &Args,
    config: &FarmConfig,
) -> Result<()> {
    let dirs = args.dirs.clone();
    let defer_probability = args.defer_probability;
    let timeout = Duration::from_secs(args.timeout_secs);

    let outcome = framework::run(
        cluster,
        move || DirListingSource::new(dirs, defer_probability),
        move |_| CommandExecutor::new(timeout),
        config,
    )
    .await?;

    if let FrameworkOutcome::Controller(report) = outcome {
        for (dir, len) in report.source.listings() {
            info!(%dir, len, "listing");
        }
        info!(
            dispatched = report.tasks_dispatched,
            received = report.results_received,
            total_len = report.source.total_len(),
            "final statistics"
        );
    }
    Ok(())
}

async fn run(args: Args, config: FarmConfig) -> Result<()> {
    match TcpCluster::from_env().context("invalid rank environment")? {
        Some(cluster) => take_part(cluster, &args, &config).await,
        None => launch(&args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init(&Default::default());
            error!("failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(&config.log) {
        eprintln!("failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
