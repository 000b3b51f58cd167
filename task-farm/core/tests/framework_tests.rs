// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use task_farm_core::{
    framework, Cluster, ControllerMessage, ControllerTransport, FarmConfig, FarmError,
    FnExecutor, FrameworkOutcome, InMemoryCluster, InMemoryEndpoint, IterSource, TaskExecutor,
    TaskSource, TransportError, Worker, WorkerId, WorkerReport,
};
use tokio::task::JoinHandle;

// ============================================================
// helpers
// ============================================================

/// Collects every result it receives.
struct Collect<T> {
    tasks: std::vec::IntoIter<T>,
    results: Vec<(WorkerId, T)>,
}

impl<T> Collect<T> {
    fn new(tasks: Vec<T>) -> Self {
        Self {
            tasks: tasks.into_iter(),
            results: Vec::new(),
        }
    }
}

impl<T: Send> TaskSource for Collect<T> {
    type Task = T;
    type Output = T;

    fn next_task(&mut self) -> task_farm_core::NextTask<T> {
        self.tasks.next().into()
    }

    fn consume_result(&mut self, source: WorkerId, result: T) {
        self.results.push((source, result));
    }
}

/// Sleeps for the number of milliseconds in the task, then echoes it.
struct SleepyEcho;

#[async_trait]
impl TaskExecutor for SleepyEcho {
    type Task = u64;
    type Output = u64;

    async fn execute(&mut self, task: u64) -> u64 {
        tokio::time::sleep(Duration::from_millis(task)).await;
        task
    }
}

fn spawn_workers<E, F>(
    endpoints: Vec<InMemoryEndpoint<E::Task, E::Output>>,
    make_executor: F,
) -> Vec<JoinHandle<WorkerReport>>
where
    E: TaskExecutor + 'static,
    E::Task: 'static,
    E::Output: 'static,
    F: Fn(usize) -> E,
{
    endpoints
        .into_iter()
        .map(|endpoint| {
            let executor = make_executor(endpoint.rank());
            tokio::spawn(async move {
                let transport = endpoint.into_worker().await.unwrap();
                Worker::new(executor, transport).run().await.unwrap()
            })
        })
        .collect()
}

async fn join_all(handles: Vec<JoinHandle<WorkerReport>>) -> Vec<WorkerReport> {
    let mut reports = Vec::new();
    for handle in handles {
        reports.push(handle.await.unwrap());
    }
    reports
}

// ============================================================
// whole runs over the in-memory cluster
// ============================================================

#[tokio::test]
async fn test_liveness_every_task_assigned_exactly_once() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(3);
    let workers = endpoints.split_off(1);
    let controller = endpoints.pop().unwrap();

    let handles = spawn_workers(workers, |_| FnExecutor::new(|task: u64| task * 10));

    let outcome = framework::run(
        controller,
        || Collect::new((1..=40).collect()),
        |_| FnExecutor::new(|task: u64| task * 10),
        &FarmConfig::immediate(),
    )
    .await
    .unwrap();

    let report = outcome.into_controller_report().unwrap();
    assert_eq!(report.tasks_dispatched, 40);
    assert_eq!(report.results_received, 40);

    let mut values: Vec<u64> = report.source.results.iter().map(|(_, r)| *r).collect();
    values.sort();
    assert_eq!(values, (1..=40).map(|t| t * 10).collect::<Vec<_>>());
    assert!(report.source.results.iter().all(|(w, _)| (1..=3).contains(w)));

    let reports = join_all(handles).await;
    let executed: usize = reports.iter().map(|r| r.tasks_executed).sum();
    assert_eq!(executed, 40);
    let ranks: HashSet<usize> = reports.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, HashSet::from([1, 2, 3]));
}

#[tokio::test]
async fn test_literal_scenario_three_tasks_two_workers() {
    let mut endpoints = InMemoryCluster::create::<String, String>(2);
    let workers = endpoints.split_off(1);
    let controller = endpoints.pop().unwrap();

    let handles = spawn_workers(workers, |_| {
        FnExecutor::new(|task: String| format!("{task}-done"))
    });

    let mut consumed = Vec::new();
    let source = IterSource::new(
        vec!["A".to_string(), "B".to_string(), "C".to_string()],
        |worker: WorkerId, result: String| consumed.push((worker, result)),
    );

    let outcome = framework::run(
        controller,
        move || source,
        |_| FnExecutor::new(|task: String| task),
        &FarmConfig::immediate(),
    )
    .await
    .unwrap();
    assert!(outcome.is_controller());
    drop(outcome);

    let reports = join_all(handles).await;
    assert_eq!(reports.iter().map(|r| r.tasks_executed).sum::<usize>(), 3);

    assert_eq!(consumed.len(), 3);
    let mut results: Vec<String> = consumed.iter().map(|(_, r)| r.clone()).collect();
    results.sort();
    assert_eq!(results, vec!["A-done", "B-done", "C-done"]);
    let pairs: HashSet<(WorkerId, String)> = consumed.into_iter().collect();
    assert_eq!(pairs.len(), 3);
}

#[tokio::test]
async fn test_empty_task_sequence_never_sends_work() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(4);
    let workers = endpoints.split_off(1);
    let controller = endpoints.pop().unwrap();

    let handles = spawn_workers(workers, |_| SleepyEcho);

    let outcome = framework::run(
        controller,
        || Collect::<u64>::new(Vec::new()),
        |_| SleepyEcho,
        &FarmConfig::immediate(),
    )
    .await
    .unwrap();

    let report = outcome.into_controller_report().unwrap();
    assert_eq!(report.tasks_dispatched, 0);
    assert_eq!(report.results_received, 0);

    let reports = join_all(handles).await;
    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.tasks_executed == 0));
}

#[tokio::test]
async fn test_out_of_order_results_keep_their_source() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(2);
    let workers = endpoints.split_off(1);
    let controller = endpoints.pop().unwrap();

    let handles = spawn_workers(workers, |_| SleepyEcho);

    // worker 1 gets the slow task, worker 2 the fast one
    let outcome = framework::run(
        controller,
        || Collect::new(vec![200, 0]),
        |_| SleepyEcho,
        &FarmConfig::immediate(),
    )
    .await
    .unwrap();

    let report = outcome.into_controller_report().unwrap();
    assert_eq!(report.source.results, vec![(2, 0), (1, 200)]);
    join_all(handles).await;
}

#[tokio::test]
async fn test_controller_waits_for_busy_worker_before_exiting() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(3);
    let workers = endpoints.split_off(1);
    let controller = endpoints.pop().unwrap();

    let handles = spawn_workers(workers, |_| SleepyEcho);

    let outcome = framework::run(
        controller,
        || Collect::new(vec![100]),
        |_| SleepyEcho,
        &FarmConfig::immediate(),
    )
    .await
    .unwrap();

    // the terminate broadcast happened before the only result arrived
    let report = outcome.into_controller_report().unwrap();
    assert_eq!(report.source.results, vec![(1, 100)]);
    join_all(handles).await;
}

// ============================================================
// driver dispatch and worker protocol
// ============================================================

#[tokio::test]
async fn test_worker_rank_runs_worker_loop() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(1);
    let worker = endpoints.pop().unwrap();
    let mut controller = endpoints.pop().unwrap().into_controller().await.unwrap();

    controller.send(1, ControllerMessage::build(7)).await.unwrap();
    controller.send(1, ControllerMessage::exit()).await.unwrap();

    let outcome = framework::run(
        worker,
        || -> Collect<u64> { panic!("workers never build a task source") },
        |_| FnExecutor::new(|task: u64| task + 1),
        &FarmConfig::immediate(),
    )
    .await
    .unwrap();

    match outcome {
        FrameworkOutcome::Worker(report) => {
            assert_eq!(report, WorkerReport { rank: 1, tasks_executed: 1 });
        }
        FrameworkOutcome::Controller(_) => panic!("Expected worker outcome"),
    }

    assert!(controller.probe_pending().unwrap());
    assert_eq!(controller.receive_pending().unwrap(), (1, 8));
    assert!(
        !controller.probe_pending().unwrap(),
        "no reply to terminate"
    );
}

#[tokio::test]
async fn test_worker_replies_once_per_task_in_order() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(1);
    let worker = endpoints.pop().unwrap().into_worker().await.unwrap();
    let mut controller = endpoints.pop().unwrap().into_controller().await.unwrap();

    for task in [3, 1, 2] {
        controller.send(1, ControllerMessage::build(task)).await.unwrap();
    }
    controller.send(1, ControllerMessage::exit()).await.unwrap();
    // anything after terminate is never read
    controller.send(1, ControllerMessage::build(99)).await.unwrap_or(());

    let report = Worker::new(FnExecutor::new(|task: u64| task * task), worker)
        .run()
        .await
        .unwrap();
    assert_eq!(report.tasks_executed, 3);

    let mut received = Vec::new();
    while controller.probe_pending().unwrap() {
        received.push(controller.receive_pending().unwrap());
    }
    assert_eq!(received, vec![(1, 9), (1, 1), (1, 4)]);
}

#[tokio::test]
async fn test_receive_without_pending_is_a_violation() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(1);
    let mut controller = endpoints.swap_remove(0).into_controller().await.unwrap();

    assert!(!controller.probe_pending().unwrap());
    let error = controller.receive_pending().unwrap_err();
    assert!(error.is_protocol_violation());
}

#[tokio::test]
async fn test_send_to_rank_outside_cluster_fails() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(2);
    let mut controller = endpoints.swap_remove(0).into_controller().await.unwrap();

    for rank in [0, 3] {
        let error = controller
            .send(rank, ControllerMessage::exit())
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::InvalidRank(r) if r == rank));
    }
}

#[tokio::test]
async fn test_worker_fails_when_controller_disappears() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(1);
    let worker = endpoints.pop().unwrap().into_worker().await.unwrap();
    drop(endpoints);

    let error = Worker::new(FnExecutor::new(|task: u64| task), worker)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        FarmError::Transport(TransportError::Disconnected(0))
    ));
}

#[tokio::test]
async fn test_endpoints_refuse_the_wrong_role() {
    let mut endpoints = InMemoryCluster::create::<u64, u64>(1);
    let worker = endpoints.pop().unwrap();
    let controller = endpoints.pop().unwrap();

    assert_eq!(controller.size(), 2);
    assert!(controller.into_worker().await.is_err());
    assert!(worker.into_controller().await.is_err());
}

#[test]
fn test_worker_host_name_comes_from_the_system() {
    // not exported by every shell, so it must not matter
    std::env::remove_var("HOSTNAME");

    let expected = nix::unistd::gethostname()
        .unwrap()
        .into_string()
        .unwrap();
    assert!(!expected.is_empty());
    assert_eq!(task_farm_core::worker::hostname(), expected);
}
