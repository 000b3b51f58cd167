// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::launch_error::LaunchError;
use crate::tcp_cluster::{CONTROLLER_ADDR_VAR, RANK_VAR, SIZE_VAR};
use futures::stream::{FuturesUnordered, StreamExt};
use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{info, warn};

/// Starts one process per rank and waits for all of them.
///
/// Every process runs the same program with the same arguments; only the
/// rank environment differs. If any rank fails, the others are killed.
pub struct Launcher {
    program: PathBuf,
    args: Vec<OsString>,
    num_workers: usize,
    controller_addr: SocketAddr,
}

impl Launcher {
    pub fn new(program: impl Into<PathBuf>, num_workers: usize, controller_addr: SocketAddr) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            num_workers,
            controller_addr,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// A loopback address that was free a moment ago.
    pub fn free_local_addr() -> Result<SocketAddr, LaunchError> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        Ok(listener.local_addr()?)
    }

    pub async fn run(&self) -> Result<(), LaunchError> {
        if self.num_workers == 0 {
            return Err(LaunchError::InvalidSize(1));
        }
        let size = self.num_workers + 1;
        info!(
            workers = self.num_workers,
            controller = %self.controller_addr,
            "launching {} processes",
            size
        );

        let mut running = FuturesUnordered::new();
        for rank in 0..size {
            let mut child = Command::new(&self.program)
                .args(&self.args)
                .env(RANK_VAR, rank.to_string())
                .env(SIZE_VAR, size.to_string())
                .env(CONTROLLER_ADDR_VAR, self.controller_addr.to_string())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| LaunchError::Spawn { rank, source })?;
            running.push(async move { (rank, child.wait().await) });
        }

        // Dropping `running` early kills every rank still alive
        while let Some((rank, status)) = running.next().await {
            let status = status?;
            if !status.success() {
                warn!(rank, code = ?status.code(), "rank failed, stopping the run");
                return Err(LaunchError::RankFailed {
                    rank,
                    code: status.code(),
                });
            }
            info!(rank, "exited cleanly");
        }
        Ok(())
    }
}
