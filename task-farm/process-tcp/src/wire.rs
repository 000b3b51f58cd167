// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use task_farm_core::{Rank, TransportError};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

pub type FrameReader = FramedRead<OwnedReadHalf, LengthDelimitedCodec>;
pub type FrameWriter = FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>;

/// First frame a worker sends after connecting.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Hello {
    pub rank: Rank,
}

pub fn frame(stream: tokio::net::TcpStream) -> (FrameReader, FrameWriter) {
    let (read, write) = stream.into_split();
    (
        FramedRead::new(read, LengthDelimitedCodec::new()),
        FramedWrite::new(write, LengthDelimitedCodec::new()),
    )
}

pub fn encode<M: Serialize>(message: &M) -> Result<Bytes, TransportError> {
    Ok(Bytes::from(serde_json::to_vec(message)?))
}

pub async fn send_frame(writer: &mut FrameWriter, frame: Bytes) -> Result<(), TransportError> {
    writer.send(frame).await?;
    Ok(())
}

/// Next JSON frame, or `None` once the peer has closed the connection.
pub async fn recv_json<M: DeserializeOwned>(
    reader: &mut FrameReader,
) -> Result<Option<M>, TransportError> {
    match reader.next().await {
        Some(Ok(bytes)) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}
