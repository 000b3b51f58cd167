// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::ProtocolViolation;
use crate::types::WorkerId;
use std::collections::BTreeSet;

/// Controller-side record of which workers are idle.
///
/// Workers are handed out lowest id first so a run is reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPool {
    total: usize,
    available: BTreeSet<WorkerId>,
    termination_initiated: bool,
}

impl WorkerPool {
    /// Pool of workers `1..=total`, all idle.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            available: (1..=total).collect(),
            termination_initiated: false,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn busy_count(&self) -> usize {
        self.total - self.available.len()
    }

    pub fn has_available(&self) -> bool {
        !self.available.is_empty()
    }

    pub fn is_available(&self, id: WorkerId) -> bool {
        self.available.contains(&id)
    }

    pub fn mark_available(&mut self, id: WorkerId) -> Result<(), ProtocolViolation> {
        if id == 0 || id > self.total {
            return Err(ProtocolViolation::UnknownWorker {
                id,
                total: self.total,
            });
        }
        if !self.available.insert(id) {
            return Err(ProtocolViolation::DuplicateWorker(id));
        }
        Ok(())
    }

    pub fn take_available(&mut self) -> Result<WorkerId, ProtocolViolation> {
        self.available
            .pop_first()
            .ok_or(ProtocolViolation::PoolExhausted)
    }

    /// True once every worker has come back from its last task.
    pub fn all_idle(&self) -> bool {
        self.available.len() == self.total
    }

    pub fn initiate_termination(&mut self) {
        self.termination_initiated = true;
    }

    pub fn termination_initiated(&self) -> bool {
        self.termination_initiated
    }

    /// Every worker id in the pool, idle or busy.
    pub fn all_workers(&self) -> impl Iterator<Item = WorkerId> {
        1..=self.total
    }
}
