// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::types::{Rank, WorkerId};
use thiserror::Error;

/// A core invariant was broken. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("worker {0} reported available twice without an assignment in between")]
    DuplicateWorker(WorkerId),

    #[error("worker id {id} is outside the pool 1..={total}")]
    UnknownWorker { id: WorkerId, total: usize },

    #[error("no available worker to take")]
    PoolExhausted,

    #[error("tried to unwrap a task from a terminate message")]
    TaskFromTerminate,

    #[error("non-blocking receive called with no pending message")]
    NoPendingMessage,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode a message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("peer with rank {0} disconnected")]
    Disconnected(Rank),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("rank {0} is not part of this run")]
    InvalidRank(Rank),
}

#[derive(Debug, Error)]
pub enum FarmError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

impl FarmError {
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, FarmError::Protocol(_))
    }
}

pub type Result<T> = std::result::Result<T, FarmError>;
