// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod types;
pub use types::{Rank, WorkerId, CONTROLLER_RANK};

pub mod error;
pub use error::{FarmError, ProtocolViolation, TransportError};

pub mod message;
pub use message::ControllerMessage;

pub mod worker_pool;
pub use worker_pool::WorkerPool;

pub mod transport;
pub use transport::{Cluster, ControllerTransport, WorkerTransport};

pub mod task_source;
pub use task_source::{IterSource, NextTask, TaskSource};

pub mod task_executor;
pub use task_executor::{FnExecutor, TaskExecutor};

pub mod config;
pub use config::{FarmConfig, LogConfig};

pub mod timer;
pub use timer::{Timer, TokioTimer};

pub mod logging;

pub mod controller;
pub use controller::{Controller, ControllerReport, Phase};

pub mod worker;
pub use worker::{Worker, WorkerReport};

pub mod framework;
pub use framework::FrameworkOutcome;

pub mod in_memory_transport;
pub use in_memory_transport::{InMemoryCluster, InMemoryEndpoint};
