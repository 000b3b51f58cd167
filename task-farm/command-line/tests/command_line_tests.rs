// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::{Duration, Instant};
use task_farm_command_line::{
    CommandError, CommandExecutor, CommandLine, CommandStatus, CommandTask, RunStatus,
};
use task_farm_core::TaskExecutor;

const GENEROUS: Duration = Duration::from_secs(10);

// ============================================================
// CommandLine::run
// ============================================================

#[tokio::test]
async fn test_captures_stdout_of_finished_command() {
    let run = CommandLine::run("echo hello world", "", GENEROUS)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Passed);
    assert_eq!(run.output.as_deref(), Some("hello world\n"));
    assert_eq!(run.exit_code, Some(0));
}

#[tokio::test]
async fn test_honours_shell_quoting() {
    let run = CommandLine::run("printf '%s|' 'a b' c", "", GENEROUS)
        .await
        .unwrap();

    assert_eq!(run.output.as_deref(), Some("a b|c|"));
}

#[tokio::test]
async fn test_feeds_input_to_stdin() {
    let run = CommandLine::run("cat", "piped input", GENEROUS)
        .await
        .unwrap();

    assert_eq!(run.output.as_deref(), Some("piped input"));
}

#[tokio::test]
async fn test_nonzero_exit_still_counts_as_finished() {
    let run = CommandLine::run("sh -c 'echo partial; exit 3'", "", GENEROUS)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Passed);
    assert_eq!(run.exit_code, Some(3));
    assert_eq!(run.output.as_deref(), Some("partial\n"));
}

#[tokio::test]
async fn test_timeout_terminates_the_process_group() {
    let started = Instant::now();

    let run = CommandLine::run("sh -c 'sleep 30 & sleep 30'", "", Duration::from_millis(200))
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Timeout);
    assert_eq!(run.output, None);
    assert_eq!(run.exit_code, None);
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "Should return long before the command would have finished"
    );
}

#[tokio::test]
async fn test_deadline_covers_output_held_open_by_background_process() {
    let started = Instant::now();

    // sh exits at once, the backgrounded sleep keeps stdout open
    let run = CommandLine::run("sh -c 'sleep 5 & echo hi'", "", Duration::from_millis(200))
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Timeout);
    assert_eq!(run.output, None);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "Should not wait for the background process, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_empty_command_is_rejected() {
    let error = CommandLine::run("   ", "", GENEROUS).await.unwrap_err();
    assert!(matches!(error, CommandError::EmptyCommand));

    let error = CommandLine::run_args(&[], "", GENEROUS).await.unwrap_err();
    assert!(matches!(error, CommandError::EmptyCommand));
}

#[tokio::test]
async fn test_unbalanced_quote_is_rejected() {
    let error = CommandLine::run("echo 'oops", "", GENEROUS)
        .await
        .unwrap_err();

    assert!(matches!(error, CommandError::Parse(_)));
}

#[tokio::test]
async fn test_missing_program_fails_to_spawn() {
    let error = CommandLine::run("definitely-not-a-real-program-42", "", GENEROUS)
        .await
        .unwrap_err();

    match error {
        CommandError::Spawn { program, .. } => {
            assert_eq!(program, "definitely-not-a-real-program-42")
        }
        other => panic!("Expected spawn error, got {other:?}"),
    }
}

// ============================================================
// CommandExecutor
// ============================================================

#[tokio::test]
async fn test_executor_reports_output() {
    let mut executor = CommandExecutor::new(GENEROUS);

    let outcome = executor
        .execute(CommandTask::new(["echo", "-n", "abc"]))
        .await;

    assert_eq!(outcome.status, CommandStatus::Passed);
    assert_eq!(outcome.output, "abc");
    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.command, vec!["echo", "-n", "abc"]);
}

#[tokio::test]
async fn test_executor_captures_timeout_as_data() {
    let mut executor = CommandExecutor::new(Duration::from_millis(100));

    let outcome = executor.execute(CommandTask::new(["sleep", "30"])).await;

    assert_eq!(outcome.status, CommandStatus::Timeout);
    assert!(outcome.output.is_empty());
}

#[tokio::test]
async fn test_executor_captures_launch_failure_as_data() {
    let mut executor = CommandExecutor::new(GENEROUS);

    let outcome = executor
        .execute(CommandTask::new(["definitely-not-a-real-program-42"]))
        .await;

    assert!(matches!(outcome.status, CommandStatus::Failed(_)));
    assert_eq!(outcome.exit_code, None);
}

#[test]
fn test_task_parse_splits_and_keeps_input() {
    let task = CommandTask::parse("wc -c").unwrap().with_input("12345");

    assert_eq!(task.command, vec!["wc", "-c"]);
    assert_eq!(task.input, "12345");
    assert!(CommandTask::parse("").is_err());
}
