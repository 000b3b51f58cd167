// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::config::FarmConfig;
use crate::error::Result;
use crate::logging::role_span;
use crate::message::ControllerMessage;
use crate::task_source::{NextTask, TaskSource};
use crate::timer::{Timer, TokioTimer};
use crate::transport::ControllerTransport;
use crate::types::CONTROLLER_RANK;
use crate::worker_pool::WorkerPool;
use std::time::Duration;
use tracing::{debug, info, Instrument, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Handing out tasks while the source has them
    Dispatching,
    /// Terminate sent to everyone; waiting for busy workers to report back
    Draining,
}

/// What the controller hands back after a clean shutdown.
pub struct ControllerReport<S> {
    pub source: S,
    pub tasks_dispatched: usize,
    pub results_received: usize,
}

/// Scheduling loop of the controller process.
///
/// Each iteration first drains every pending result, then either hands
/// tasks to idle workers or, once termination has started, checks whether
/// all workers are idle and the run is over.
pub struct Controller<S, C, Tm = TokioTimer> {
    source: S,
    transport: C,
    pool: WorkerPool,
    phase: Phase,
    timer: Tm,
    span: Span,
    poll_interval: Duration,
    drain_interval: Duration,
    dispatch_delay: Duration,
    tasks_dispatched: usize,
    results_received: usize,
}

impl<S, C> Controller<S, C, TokioTimer>
where
    S: TaskSource,
    C: ControllerTransport<S::Task, S::Output>,
{
    pub fn new(source: S, transport: C, config: &FarmConfig) -> Self {
        Self::with_timer(source, transport, config, TokioTimer)
    }
}

impl<S, C, Tm> Controller<S, C, Tm>
where
    S: TaskSource,
    C: ControllerTransport<S::Task, S::Output>,
    Tm: Timer,
{
    pub fn with_timer(source: S, transport: C, config: &FarmConfig, timer: Tm) -> Self {
        let pool = WorkerPool::new(transport.num_workers());
        Self {
            source,
            transport,
            pool,
            phase: Phase::Dispatching,
            timer,
            span: role_span(CONTROLLER_RANK),
            poll_interval: config.poll_interval(),
            drain_interval: config.drain_interval(),
            dispatch_delay: config.dispatch_delay(),
            tasks_dispatched: 0,
            results_received: 0,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs until the task source is exhausted and every worker is idle.
    pub async fn run(self) -> Result<ControllerReport<S>> {
        let span = self.span.clone();
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) -> Result<ControllerReport<S>> {
        info!(workers = self.pool.total(), "starting");

        while !self.step().await? {}

        info!(
            dispatched = self.tasks_dispatched,
            received = self.results_received,
            "all workers done and processed, exiting"
        );
        Ok(ControllerReport {
            source: self.source,
            tasks_dispatched: self.tasks_dispatched,
            results_received: self.results_received,
        })
    }

    /// One scheduling iteration. Returns true once the run is complete.
    pub async fn step(&mut self) -> Result<bool> {
        self.drain_results()?;

        match self.phase {
            Phase::Draining => {
                if self.pool.all_idle() {
                    return Ok(true);
                }
                debug!(busy = self.pool.busy_count(), "waiting on unfinished workers");
                self.timer.sleep(self.drain_interval).await;
            }
            Phase::Dispatching => {
                self.dispatch().await?;
                self.timer.sleep(self.poll_interval).await;
            }
        }
        Ok(false)
    }

    fn drain_results(&mut self) -> Result<()> {
        while self.transport.probe_pending()? {
            let (worker, result) = self.transport.receive_pending()?;
            self.pool.mark_available(worker)?;
            self.results_received += 1;
            debug!(worker, "result received");
            self.source.consume_result(worker, result);
        }
        Ok(())
    }

    async fn dispatch(&mut self) -> Result<()> {
        while self.pool.has_available() {
            match self.source.next_task() {
                NextTask::Ready(task) => {
                    let worker = self.pool.take_available()?;
                    info!(worker, task = self.tasks_dispatched, "assigning task");
                    self.transport
                        .send(worker, ControllerMessage::build(task))
                        .await?;
                    self.tasks_dispatched += 1;
                    if !self.dispatch_delay.is_zero() {
                        self.timer.sleep(self.dispatch_delay).await;
                    }
                }
                NextTask::Pending => {
                    debug!("waiting for new tasks to occur");
                    break;
                }
                NextTask::Exhausted => {
                    self.terminate_everything().await?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Busy workers see the terminate after replying to their current task.
    async fn terminate_everything(&mut self) -> Result<()> {
        self.source.on_exhausted();
        self.pool.initiate_termination();

        for worker in 1..=self.pool.total() {
            self.transport
                .send(worker, ControllerMessage::exit())
                .await?;
        }
        self.phase = Phase::Draining;

        info!(
            busy = self.pool.busy_count(),
            "task source exhausted, terminate sent to all workers"
        );
        Ok(())
    }
}
