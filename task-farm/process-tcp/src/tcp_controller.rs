// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::wire::{encode, frame, recv_json, send_frame, FrameReader, FrameWriter, Hello};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;
use task_farm_core::{
    ControllerMessage, ControllerTransport, FarmError, ProtocolViolation, TransportError, WorkerId,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Inbound<R> = Result<(WorkerId, R), TransportError>;

/// Controller end of the TCP transport: one connection per worker.
///
/// A reader task per connection forwards decoded results into a single
/// queue, which `probe_pending` polls without blocking.
pub struct TcpController<T, R> {
    writers: Vec<FrameWriter>,
    results: UnboundedReceiver<Inbound<R>>,
    pending: Option<(WorkerId, R)>,
    readers: Vec<JoinHandle<()>>,
    _task: PhantomData<fn(T)>,
}

impl<T, R> TcpController<T, R>
where
    R: DeserializeOwned + Send + 'static,
{
    /// Waits until every rank in `1..=num_workers` has connected and said hello.
    pub async fn accept(
        listener: TcpListener,
        num_workers: usize,
        handshake_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let connections = tokio::time::timeout(
            handshake_timeout,
            accept_workers(&listener, num_workers),
        )
        .await
        .map_err(|_| {
            TransportError::Handshake(format!(
                "not all {} workers connected within {:?}",
                num_workers, handshake_timeout
            ))
        })??;

        let (tx, results) = mpsc::unbounded_channel();
        let mut writers = Vec::with_capacity(num_workers);
        let mut readers = Vec::with_capacity(num_workers);
        for (index, (reader, writer)) in connections.into_iter().enumerate() {
            writers.push(writer);
            readers.push(tokio::spawn(forward_results(index + 1, reader, tx.clone())));
        }
        info!(workers = num_workers, "all workers connected");

        Ok(Self {
            writers,
            results,
            pending: None,
            readers,
            _task: PhantomData,
        })
    }
}

async fn accept_workers(
    listener: &TcpListener,
    num_workers: usize,
) -> Result<Vec<(FrameReader, FrameWriter)>, TransportError> {
    let mut slots: Vec<Option<(FrameReader, FrameWriter)>> =
        (0..num_workers).map(|_| None).collect();
    let mut connected = 0;

    while connected < num_workers {
        let (stream, peer) = listener.accept().await?;
        let (mut reader, writer) = frame(stream);
        let hello: Hello = recv_json(&mut reader).await?.ok_or_else(|| {
            TransportError::Handshake(format!("{} closed before saying hello", peer))
        })?;

        let slot = hello
            .rank
            .checked_sub(1)
            .and_then(|index| slots.get_mut(index))
            .ok_or(TransportError::InvalidRank(hello.rank))?;
        if slot.is_some() {
            return Err(TransportError::Handshake(format!(
                "rank {} connected twice",
                hello.rank
            )));
        }
        *slot = Some((reader, writer));
        connected += 1;
        debug!(rank = hello.rank, %peer, "worker connected");
    }

    Ok(slots.into_iter().flatten().collect())
}

async fn forward_results<R: DeserializeOwned>(
    rank: WorkerId,
    mut reader: FrameReader,
    results: UnboundedSender<Inbound<R>>,
) {
    loop {
        match recv_json::<R>(&mut reader).await {
            Ok(Some(result)) => {
                if results.send(Ok((rank, result))).is_err() {
                    return;
                }
            }
            Ok(None) => {
                debug!(rank, "worker closed its connection");
                return;
            }
            Err(e) => {
                warn!(rank, "failed to read from worker: {}", e);
                let _ = results.send(Err(e));
                return;
            }
        }
    }
}

#[async_trait]
impl<T, R> ControllerTransport<T, R> for TcpController<T, R>
where
    T: Serialize + Send + 'static,
    R: Send + 'static,
{
    fn num_workers(&self) -> usize {
        self.writers.len()
    }

    async fn send(
        &mut self,
        destination: WorkerId,
        message: ControllerMessage<T>,
    ) -> Result<(), TransportError> {
        let writer = destination
            .checked_sub(1)
            .and_then(|index| self.writers.get_mut(index))
            .ok_or(TransportError::InvalidRank(destination))?;
        let frame = encode(&message)?;
        send_frame(writer, frame).await
    }

    fn probe_pending(&mut self) -> Result<bool, TransportError> {
        if self.pending.is_some() {
            return Ok(true);
        }
        match self.results.try_recv() {
            Ok(Ok(result)) => {
                self.pending = Some(result);
                Ok(true)
            }
            Ok(Err(e)) => Err(e),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(false),
        }
    }

    fn receive_pending(&mut self) -> Result<(WorkerId, R), FarmError> {
        self.pending
            .take()
            .ok_or_else(|| ProtocolViolation::NoPendingMessage.into())
    }
}

impl<T, R> Drop for TcpController<T, R> {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}
