// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::wire::{encode, frame, recv_json, send_frame, FrameReader, FrameWriter, Hello};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::time::Duration;
use task_farm_core::{
    ControllerMessage, Rank, TransportError, WorkerTransport, CONTROLLER_RANK,
};
use tokio::net::TcpStream;
use tracing::debug;

const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// Worker end of the TCP transport: a single connection to the controller.
pub struct TcpWorker<T, R> {
    rank: Rank,
    reader: FrameReader,
    writer: FrameWriter,
    _messages: PhantomData<fn(T) -> R>,
}

impl<T, R> TcpWorker<T, R> {
    /// Connects to the controller, retrying while it is still starting up.
    pub async fn connect(rank: Rank, controller: SocketAddr) -> Result<Self, TransportError> {
        let mut attempts = 0;
        let stream = loop {
            match TcpStream::connect(controller).await {
                Ok(stream) => break stream,
                Err(e) => {
                    attempts += 1;
                    if attempts >= CONNECT_ATTEMPTS {
                        return Err(TransportError::Handshake(format!(
                            "failed to connect to controller at {} after {} attempts: {}",
                            controller, attempts, e
                        )));
                    }
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                }
            }
        };

        let (reader, mut writer) = frame(stream);
        send_frame(&mut writer, encode(&Hello { rank })?).await?;
        debug!(rank, %controller, "connected to controller");

        Ok(Self {
            rank,
            reader,
            writer,
            _messages: PhantomData,
        })
    }
}

#[async_trait]
impl<T, R> WorkerTransport<T, R> for TcpWorker<T, R>
where
    T: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
{
    fn rank(&self) -> Rank {
        self.rank
    }

    async fn receive(&mut self) -> Result<ControllerMessage<T>, TransportError> {
        recv_json(&mut self.reader)
            .await?
            .ok_or(TransportError::Disconnected(CONTROLLER_RANK))
    }

    async fn send_result(&mut self, result: R) -> Result<(), TransportError> {
        let frame = encode(&result)?;
        send_frame(&mut self.writer, frame).await
    }
}
