// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::command_error::CommandError;
use crate::command_line::{self, CommandLine, RunStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use task_farm_core::TaskExecutor;

/// A command for a worker to run, plus what to feed its stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTask {
    pub command: Vec<String>,
    pub input: String,
}

impl CommandTask {
    pub fn new<S: Into<String>>(command: impl IntoIterator<Item = S>) -> Self {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            input: String::new(),
        }
    }

    pub fn parse(command_line: &str) -> Result<Self, CommandError> {
        Ok(Self::new(command_line::split(command_line)?))
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Passed,
    Timeout,
    /// The command could not be run at all
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command: Vec<String>,
    pub status: CommandStatus,
    pub exit_code: Option<i32>,
    pub output: String,
}

/// Runs each task as a subprocess with a deadline.
/// Timeouts and launch failures come back as outcomes, never as errors.
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TaskExecutor for CommandExecutor {
    type Task = CommandTask;
    type Output = CommandOutcome;

    async fn execute(&mut self, task: CommandTask) -> CommandOutcome {
        let run = CommandLine::run_args(&task.command, &task.input, self.timeout).await;
        let (status, exit_code, output) = match run {
            Ok(run) => match run.status {
                RunStatus::Passed => (
                    CommandStatus::Passed,
                    run.exit_code,
                    run.output.unwrap_or_default(),
                ),
                RunStatus::Timeout => (CommandStatus::Timeout, None, String::new()),
            },
            Err(e) => (CommandStatus::Failed(e.to_string()), None, String::new()),
        };
        CommandOutcome {
            command: task.command,
            status,
            exit_code,
            output,
        }
    }
}
