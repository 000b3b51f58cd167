// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::TransportError;
use crate::message::ControllerMessage;
use crate::types::{Rank, WorkerId};
use async_trait::async_trait;

/// Controller end of the ranked message-passing substrate.
///
/// Messages to one worker must arrive in the order they were sent.
#[async_trait]
pub trait ControllerTransport<T, R>: Send {
    /// Number of worker processes, `N`.
    fn num_workers(&self) -> usize;

    async fn send(
        &mut self,
        destination: WorkerId,
        message: ControllerMessage<T>,
    ) -> Result<(), TransportError>;

    /// Checks for a result from any worker without blocking.
    fn probe_pending(&mut self) -> Result<bool, TransportError>;

    /// Takes the pending result found by `probe_pending`.
    /// Fails with `NoPendingMessage` when nothing is pending.
    fn receive_pending(&mut self) -> crate::error::Result<(WorkerId, R)>;
}

/// Worker end of the substrate. Only ever talks to the controller.
#[async_trait]
pub trait WorkerTransport<T, R>: Send {
    fn rank(&self) -> Rank;

    /// Blocks until the controller sends the next message.
    async fn receive(&mut self) -> Result<ControllerMessage<T>, TransportError>;

    async fn send_result(&mut self, result: R) -> Result<(), TransportError>;
}

/// A process's handle on the run before it knows its role.
#[async_trait]
pub trait Cluster<T, R>: Send {
    type Controller: ControllerTransport<T, R>;
    type Worker: WorkerTransport<T, R>;

    fn rank(&self) -> Rank;

    /// Total participants, controller included.
    fn size(&self) -> usize;

    async fn into_controller(self) -> Result<Self::Controller, TransportError>;

    async fn into_worker(self) -> Result<Self::Worker, TransportError>;
}
