// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::ProtocolViolation;
use serde::{Deserialize, Serialize};

/// Message sent from the controller to a worker.
///
/// Results travel the other way as plain values; the transport tells the
/// controller which worker they came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ControllerMessage<T> {
    /// One task to execute
    Work(T),
    /// Exit without replying
    Terminate,
}

impl<T> ControllerMessage<T> {
    pub fn build(task: T) -> Self {
        ControllerMessage::Work(task)
    }

    pub fn exit() -> Self {
        ControllerMessage::Terminate
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, ControllerMessage::Terminate)
    }

    pub fn task(&self) -> Option<&T> {
        match self {
            ControllerMessage::Work(task) => Some(task),
            ControllerMessage::Terminate => None,
        }
    }

    /// Takes the task out of a `Work` message.
    /// Callers check `is_terminate` first; a `Terminate` here is a protocol violation.
    pub fn into_task(self) -> Result<T, ProtocolViolation> {
        match self {
            ControllerMessage::Work(task) => Ok(task),
            ControllerMessage::Terminate => Err(ProtocolViolation::TaskFromTerminate),
        }
    }
}
