// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::launch_error::LaunchError;
use crate::tcp_controller::TcpController;
use crate::tcp_worker::TcpWorker;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::time::Duration;
use task_farm_core::{Cluster, Rank, TransportError, CONTROLLER_RANK};
use tokio::net::TcpListener;

pub const RANK_VAR: &str = "TASK_FARM_RANK";
pub const SIZE_VAR: &str = "TASK_FARM_SIZE";
pub const CONTROLLER_ADDR_VAR: &str = "TASK_FARM_CONTROLLER_ADDR";

const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// This process's place in a TCP run: its rank, the number of
/// participants, and where the controller listens.
#[derive(Debug)]
pub struct TcpCluster<T, R> {
    rank: Rank,
    size: usize,
    controller_addr: SocketAddr,
    handshake_timeout: Duration,
    _messages: PhantomData<fn(T) -> R>,
}

impl<T, R> TcpCluster<T, R> {
    pub fn new(rank: Rank, size: usize, controller_addr: SocketAddr) -> Result<Self, LaunchError> {
        if size < 2 {
            return Err(LaunchError::InvalidSize(size));
        }
        if rank >= size {
            return Err(LaunchError::RankOutOfRange { rank, size });
        }
        Ok(Self {
            rank,
            size,
            controller_addr,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            _messages: PhantomData,
        })
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Reads the rank contract set by the launcher.
    /// `Ok(None)` means this process was not started by a launcher.
    pub fn from_env() -> Result<Option<Self>, LaunchError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, LaunchError> {
        let Some(rank) = lookup(RANK_VAR) else {
            return Ok(None);
        };
        let rank = parse_var(RANK_VAR, rank)?;
        let size = parse_var(SIZE_VAR, required(&lookup, SIZE_VAR)?)?;
        let controller_addr = parse_var(CONTROLLER_ADDR_VAR, required(&lookup, CONTROLLER_ADDR_VAR)?)?;
        Self::new(rank, size, controller_addr).map(Some)
    }

    pub fn controller_addr(&self) -> SocketAddr {
        self.controller_addr
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String, LaunchError> {
    lookup(name).ok_or(LaunchError::MissingVar(name))
}

fn parse_var<V: std::str::FromStr>(name: &'static str, value: String) -> Result<V, LaunchError> {
    value
        .parse()
        .map_err(|_| LaunchError::InvalidVar { name, value })
}

#[async_trait]
impl<T, R> Cluster<T, R> for TcpCluster<T, R>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    type Controller = TcpController<T, R>;
    type Worker = TcpWorker<T, R>;

    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn into_controller(self) -> Result<Self::Controller, TransportError> {
        if self.rank != CONTROLLER_RANK {
            return Err(TransportError::Handshake(format!(
                "rank {} is not the controller",
                self.rank
            )));
        }
        let listener = TcpListener::bind(self.controller_addr).await?;
        TcpController::accept(listener, self.size - 1, self.handshake_timeout).await
    }

    async fn into_worker(self) -> Result<Self::Worker, TransportError> {
        if self.rank == CONTROLLER_RANK {
            return Err(TransportError::Handshake(
                "the controller cannot act as a worker".to_string(),
            ));
        }
        TcpWorker::connect(self.rank, self.controller_addr).await
    }
}
