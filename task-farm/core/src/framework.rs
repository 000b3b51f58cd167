// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::config::FarmConfig;
use crate::controller::{Controller, ControllerReport};
use crate::error::Result;
use crate::logging::role_span;
use crate::task_executor::TaskExecutor;
use crate::task_source::TaskSource;
use crate::transport::Cluster;
use crate::types::{Rank, CONTROLLER_RANK};
use crate::worker::{Worker, WorkerReport};
use tracing::info;

/// How this process took part in the run.
pub enum FrameworkOutcome<S> {
    Controller(ControllerReport<S>),
    Worker(WorkerReport),
}

impl<S> FrameworkOutcome<S> {
    pub fn is_controller(&self) -> bool {
        matches!(self, FrameworkOutcome::Controller(_))
    }

    pub fn into_controller_report(self) -> Option<ControllerReport<S>> {
        match self {
            FrameworkOutcome::Controller(report) => Some(report),
            FrameworkOutcome::Worker(_) => None,
        }
    }
}

/// Entry point for every process of a run.
///
/// Rank 0 builds the task source and runs the controller loop; every other
/// rank builds an executor and runs a worker loop. Only the factory for the
/// role this process plays is called.
pub async fn run<K, S, E>(
    cluster: K,
    make_source: impl FnOnce() -> S,
    make_executor: impl FnOnce(Rank) -> E,
    config: &FarmConfig,
) -> Result<FrameworkOutcome<S>>
where
    S: TaskSource,
    E: TaskExecutor<Task = S::Task, Output = S::Output>,
    K: Cluster<S::Task, S::Output>,
{
    let rank = cluster.rank();
    let span = role_span(rank);

    if rank == CONTROLLER_RANK {
        info!(parent: &span, size = cluster.size(), "new run beginning");
        let transport = cluster.into_controller().await?;
        let report = Controller::new(make_source(), transport, config)
            .with_span(span)
            .run()
            .await?;
        Ok(FrameworkOutcome::Controller(report))
    } else {
        let transport = cluster.into_worker().await?;
        let report = Worker::new(make_executor(rank), transport)
            .with_span(span)
            .run()
            .await?;
        Ok(FrameworkOutcome::Worker(report))
    }
}
