// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{FarmError, ProtocolViolation, TransportError};
use crate::message::ControllerMessage;
use crate::transport::{Cluster, ControllerTransport, WorkerTransport};
use crate::types::{Rank, WorkerId, CONTROLLER_RANK};
use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Runs every rank of a cluster as tasks of one process, over channels.
pub struct InMemoryCluster;

impl InMemoryCluster {
    /// One endpoint per rank; index 0 is the controller.
    pub fn create<T, R>(num_workers: usize) -> Vec<InMemoryEndpoint<T, R>> {
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let mut work_senders = Vec::with_capacity(num_workers);
        let mut workers = Vec::with_capacity(num_workers);

        for rank in 1..=num_workers {
            let (work_tx, work_rx) = mpsc::unbounded_channel();
            work_senders.push(work_tx);
            workers.push(InMemoryEndpoint {
                rank,
                size: num_workers + 1,
                role: Role::Worker(InMemoryWorker {
                    rank,
                    inbox: work_rx,
                    results: result_tx.clone(),
                }),
            });
        }

        let controller = InMemoryEndpoint {
            rank: CONTROLLER_RANK,
            size: num_workers + 1,
            role: Role::Controller(InMemoryController {
                workers: work_senders,
                results: result_rx,
                pending: None,
            }),
        };

        std::iter::once(controller).chain(workers).collect()
    }
}

enum Role<T, R> {
    Controller(InMemoryController<T, R>),
    Worker(InMemoryWorker<T, R>),
}

pub struct InMemoryEndpoint<T, R> {
    rank: Rank,
    size: usize,
    role: Role<T, R>,
}

pub struct InMemoryController<T, R> {
    workers: Vec<UnboundedSender<ControllerMessage<T>>>,
    results: UnboundedReceiver<(WorkerId, R)>,
    pending: Option<(WorkerId, R)>,
}

pub struct InMemoryWorker<T, R> {
    rank: Rank,
    inbox: UnboundedReceiver<ControllerMessage<T>>,
    results: UnboundedSender<(WorkerId, R)>,
}

#[async_trait]
impl<T, R> Cluster<T, R> for InMemoryEndpoint<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    type Controller = InMemoryController<T, R>;
    type Worker = InMemoryWorker<T, R>;

    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn into_controller(self) -> Result<Self::Controller, TransportError> {
        match self.role {
            Role::Controller(controller) => Ok(controller),
            Role::Worker(_) => Err(TransportError::Handshake(format!(
                "rank {} is not the controller",
                self.rank
            ))),
        }
    }

    async fn into_worker(self) -> Result<Self::Worker, TransportError> {
        match self.role {
            Role::Worker(worker) => Ok(worker),
            Role::Controller(_) => Err(TransportError::Handshake(
                "the controller cannot act as a worker".to_string(),
            )),
        }
    }
}

#[async_trait]
impl<T, R> ControllerTransport<T, R> for InMemoryController<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    fn num_workers(&self) -> usize {
        self.workers.len()
    }

    async fn send(
        &mut self,
        destination: WorkerId,
        message: ControllerMessage<T>,
    ) -> Result<(), TransportError> {
        let inbox = destination
            .checked_sub(1)
            .and_then(|index| self.workers.get(index))
            .ok_or(TransportError::InvalidRank(destination))?;
        inbox
            .send(message)
            .map_err(|_| TransportError::Disconnected(destination))
    }

    fn probe_pending(&mut self) -> Result<bool, TransportError> {
        if self.pending.is_some() {
            return Ok(true);
        }
        match self.results.try_recv() {
            Ok(message) => {
                self.pending = Some(message);
                Ok(true)
            }
            // Every worker has exited; nothing more can arrive
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(false),
        }
    }

    fn receive_pending(&mut self) -> Result<(WorkerId, R), FarmError> {
        self.pending
            .take()
            .ok_or_else(|| ProtocolViolation::NoPendingMessage.into())
    }
}

#[async_trait]
impl<T, R> WorkerTransport<T, R> for InMemoryWorker<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    fn rank(&self) -> Rank {
        self.rank
    }

    async fn receive(&mut self) -> Result<ControllerMessage<T>, TransportError> {
        self.inbox
            .recv()
            .await
            .ok_or(TransportError::Disconnected(CONTROLLER_RANK))
    }

    async fn send_result(&mut self, result: R) -> Result<(), TransportError> {
        self.results
            .send((self.rank, result))
            .map_err(|_| TransportError::Disconnected(CONTROLLER_RANK))
    }
}
