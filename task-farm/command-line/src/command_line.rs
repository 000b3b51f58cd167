// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::command_error::CommandError;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// How long a timed-out process group gets to exit after SIGTERM before
/// the child is killed outright.
const KILL_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Passed,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRun {
    pub status: RunStatus,
    /// Captured stdout; `None` when the command timed out
    pub output: Option<String>,
    pub exit_code: Option<i32>,
}

pub struct CommandLine;

impl CommandLine {
    /// Runs a self-contained command line, split with shell quoting rules.
    pub async fn run(
        command_line: &str,
        input: &str,
        timeout: Duration,
    ) -> Result<CommandRun, CommandError> {
        let args = split(command_line)?;
        Self::run_args(&args, input, timeout).await
    }

    /// Runs `args[0]` with the remaining arguments in its own process group.
    /// When `timeout` passes first, the whole group gets SIGTERM.
    pub async fn run_args(
        args: &[String],
        input: &str,
        timeout: Duration,
    ) -> Result<CommandRun, CommandError> {
        let (program, rest) = args.split_first().ok_or(CommandError::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Captured up front: `Child::id` is gone once the child has been reaped
        let pid = child.id();

        let mut stdin = child.stdin.take().ok_or(CommandError::MissingPipe("stdin"))?;
        let input = input.as_bytes().to_vec();
        let mut writer = tokio::spawn(async move {
            // The child may exit without reading its input
            let _ = stdin.write_all(&input).await;
        });

        let mut stdout = child
            .stdout
            .take()
            .ok_or(CommandError::MissingPipe("stdout"))?;
        let mut reader = tokio::spawn(async move {
            let mut buffer = Vec::new();
            stdout.read_to_end(&mut buffer).await.map(|_| buffer)
        });

        // One deadline for the exit and for stdout to close; a background
        // process left in the group can hold the pipe open after the child exits
        let finished = tokio::time::timeout(timeout, async {
            let status = child.wait().await?;
            let _ = (&mut writer).await;
            let buffer = (&mut reader).await.map_err(|e| CommandError::Io(e.into()))??;
            Ok::<_, CommandError>((status, buffer))
        })
        .await;

        match finished {
            Ok(finished) => {
                let (status, buffer) = finished?;
                debug!(program = %program, code = ?status.code(), "command finished");
                Ok(CommandRun {
                    status: RunStatus::Passed,
                    output: Some(String::from_utf8_lossy(&buffer).into_owned()),
                    exit_code: status.code(),
                })
            }
            Err(_) => {
                warn!(program = %program, ?timeout, "command timed out, terminating its process group");
                terminate_group(pid, &mut child).await;
                writer.abort();
                reader.abort();
                Ok(CommandRun {
                    status: RunStatus::Timeout,
                    output: None,
                    exit_code: None,
                })
            }
        }
    }
}

pub fn split(command_line: &str) -> Result<Vec<String>, CommandError> {
    let args = shlex::split(command_line)
        .ok_or_else(|| CommandError::Parse(command_line.to_string()))?;
    if args.is_empty() {
        return Err(CommandError::EmptyCommand);
    }
    Ok(args)
}

async fn terminate_group(pid: Option<u32>, child: &mut Child) {
    if let Some(pid) = pid {
        // The group id equals the child's pid after process_group(0)
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(pid, "failed to signal process group: {}", e);
        }
    }
    if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
        let _ = child.kill().await;
    }
}
