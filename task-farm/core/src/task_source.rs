// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::types::WorkerId;
use std::marker::PhantomData;

/// Answer of a task source when the controller asks for more work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTask<T> {
    Ready(T),
    /// Nothing to hand out right now; ask again on a later iteration
    Pending,
    /// No more tasks, ever
    Exhausted,
}

impl<T> From<Option<T>> for NextTask<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(task) => NextTask::Ready(task),
            None => NextTask::Exhausted,
        }
    }
}

/// Produces tasks for the controller and consumes the results.
///
/// `next_task` is never called again once it has returned `Exhausted`.
pub trait TaskSource: Send {
    type Task: Send;
    type Output: Send;

    fn next_task(&mut self) -> NextTask<Self::Task>;

    fn consume_result(&mut self, source: WorkerId, result: Self::Output);

    /// Called once, right before workers are told to terminate.
    fn on_exhausted(&mut self) {}
}

/// Task source over an iterator, with a callback for results.
pub struct IterSource<I, F, R> {
    tasks: I,
    on_result: F,
    _result: PhantomData<fn(R)>,
}

impl<I, F, R> IterSource<I, F, R>
where
    I: Iterator,
    F: FnMut(WorkerId, R),
{
    pub fn new(tasks: impl IntoIterator<IntoIter = I>, on_result: F) -> Self {
        Self {
            tasks: tasks.into_iter(),
            on_result,
            _result: PhantomData,
        }
    }
}

impl<I, F, R> TaskSource for IterSource<I, F, R>
where
    I: Iterator + Send,
    I::Item: Send,
    F: FnMut(WorkerId, R) + Send,
    R: Send,
{
    type Task = I::Item;
    type Output = R;

    fn next_task(&mut self) -> NextTask<Self::Task> {
        self.tasks.next().into()
    }

    fn consume_result(&mut self, source: WorkerId, result: R) {
        (self.on_result)(source, result)
    }
}
