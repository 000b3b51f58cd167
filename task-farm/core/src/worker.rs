// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::Result;
use crate::logging::role_span;
use crate::task_executor::TaskExecutor;
use crate::transport::WorkerTransport;
use crate::types::Rank;
use tracing::{debug, info, Instrument, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub rank: Rank,
    pub tasks_executed: usize,
}

/// Receive, execute, reply; until the controller says terminate.
pub struct Worker<E, W> {
    executor: E,
    transport: W,
    span: Span,
}

impl<E, W> Worker<E, W>
where
    E: TaskExecutor,
    W: WorkerTransport<E::Task, E::Output>,
{
    pub fn new(executor: E, transport: W) -> Self {
        let span = role_span(transport.rank());
        Self {
            executor,
            transport,
            span,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub async fn run(self) -> Result<WorkerReport> {
        let span = self.span.clone();
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) -> Result<WorkerReport> {
        let rank = self.transport.rank();
        let host = hostname();
        let mut tasks_executed = 0;

        loop {
            let message = self.transport.receive().await?;
            if message.is_terminate() {
                info!(tasks_executed, "exiting by request");
                return Ok(WorkerReport {
                    rank,
                    tasks_executed,
                });
            }

            let task = message.into_task()?;
            info!(host = %host, "executing task");
            let result = self.executor.execute(task).await;
            self.transport.send_result(result).await?;
            tasks_executed += 1;
            debug!(tasks_executed, "result sent");
        }
    }
}

/// Name of the machine this worker runs on, for log lines.
pub fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
