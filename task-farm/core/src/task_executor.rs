// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use std::marker::PhantomData;

/// Worker-side capability that turns one task into one result.
///
/// Failures are reported as part of `Output`; the worker loop forwards
/// whatever comes back and never retries.
#[async_trait]
pub trait TaskExecutor: Send {
    type Task: Send;
    type Output: Send;

    async fn execute(&mut self, task: Self::Task) -> Self::Output;
}

/// Executor backed by a plain function.
pub struct FnExecutor<F, T> {
    f: F,
    _task: PhantomData<fn(T)>,
}

impl<F, T, R> FnExecutor<F, T>
where
    F: FnMut(T) -> R,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _task: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, R> TaskExecutor for FnExecutor<F, T>
where
    F: FnMut(T) -> R + Send,
    T: Send + 'static,
    R: Send + 'static,
{
    type Task = T;
    type Output = R;

    async fn execute(&mut self, task: T) -> R {
        (self.f)(task)
    }
}
