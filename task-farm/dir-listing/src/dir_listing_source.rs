// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use task_farm_command_line::{CommandOutcome, CommandStatus, CommandTask};
use task_farm_core::{NextTask, TaskSource, WorkerId};
use tracing::{info, warn};

/// Hands out one `ls <dir>` per directory and sums the listing sizes.
///
/// Before each directory the source may ask the controller to wait,
/// with probability `defer_probability`, to exercise deferred dispatch.
pub struct DirListingSource {
    dirs: VecDeque<String>,
    rng: StdRng,
    defer_probability: f64,
    just_deferred: bool,
    listings: Vec<(String, usize)>,
    total_len: usize,
    failures: Vec<(String, CommandStatus)>,
}

impl DirListingSource {
    pub fn new(dirs: impl IntoIterator<Item = String>, defer_probability: f64) -> Self {
        Self::with_rng(dirs, defer_probability, StdRng::from_os_rng())
    }

    pub fn with_rng(
        dirs: impl IntoIterator<Item = String>,
        defer_probability: f64,
        rng: StdRng,
    ) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
            rng,
            defer_probability: if defer_probability.is_nan() {
                0.0
            } else {
                defer_probability.clamp(0.0, 1.0)
            },
            just_deferred: false,
            listings: Vec::new(),
            total_len: 0,
            failures: Vec::new(),
        }
    }

    /// `(directory, listing length)` in the order results arrived.
    pub fn listings(&self) -> &[(String, usize)] {
        &self.listings
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn failures(&self) -> &[(String, CommandStatus)] {
        &self.failures
    }
}

impl TaskSource for DirListingSource {
    type Task = CommandTask;
    type Output = CommandOutcome;

    fn next_task(&mut self) -> NextTask<CommandTask> {
        if self.dirs.is_empty() {
            return NextTask::Exhausted;
        }
        // never defer the same directory twice in a row
        if !self.just_deferred && self.rng.random_bool(self.defer_probability) {
            self.just_deferred = true;
            return NextTask::Pending;
        }
        self.just_deferred = false;
        match self.dirs.pop_front() {
            Some(dir) => NextTask::Ready(CommandTask::new(["ls".to_string(), dir])),
            None => NextTask::Exhausted,
        }
    }

    fn consume_result(&mut self, source: WorkerId, result: CommandOutcome) {
        let dir = result.command.get(1).cloned().unwrap_or_default();
        match result.status {
            CommandStatus::Passed if result.exit_code == Some(0) => {
                let len = result.output.len();
                info!(worker = source, %dir, len, "listing received");
                self.total_len += len;
                self.listings.push((dir, len));
            }
            CommandStatus::Passed => {
                warn!(worker = source, %dir, code = ?result.exit_code, "ls exited with an error");
                self.failures.push((dir, result.status));
            }
            _ => {
                warn!(worker = source, %dir, status = ?result.status, "listing failed");
                self.failures.push((dir, result.status));
            }
        }
    }

    fn on_exhausted(&mut self) {
        info!(
            directories = self.listings.len(),
            failed = self.failures.len(),
            total_len = self.total_len,
            "no directories left"
        );
    }
}
