// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod wire;

pub mod launch_error;
pub use launch_error::LaunchError;

pub mod tcp_controller;
pub use tcp_controller::TcpController;

pub mod tcp_worker;
pub use tcp_worker::TcpWorker;

pub mod tcp_cluster;
pub use tcp_cluster::{TcpCluster, CONTROLLER_ADDR_VAR, RANK_VAR, SIZE_VAR};

pub mod launcher;
pub use launcher::Launcher;
