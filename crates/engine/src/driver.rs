// SPDX-License-Identifier: MIT

//! DAG run driver (SPEC_FULL.md §4.5, §5, §9).
//!
//! One broadcast channel per run carries task-completion events; every
//! task future subscribes before the run starts so no completion can be
//! missed. Each task waits on the channel only for the dependencies it
//! actually names in `waitFor`, so independent branches run concurrently
//! without polling. Task futures are driven with `futures_util::join_all`
//! rather than spawned onto the runtime, because the whole run executes
//! inside the caller's Serializable transaction (SPEC_FULL.md §9's
//! canonical, non-variant design): a `&mut Tx` borrow cannot be smuggled
//! into a `'static` spawned task, but it composes fine with futures that
//! are only ever polled inline. Log lines flow out of the concurrently
//! polled tasks through an mpsc channel to a single task that owns the
//! transaction and writes them in order — the one place `Tx` is touched
//! while tasks are running.

use async_trait::async_trait;
use futures_util::future::join_all;
use procrun_adapters::ExecutorRegistry;
use procrun_core::{Clock, ProcessDefinition, ProcessRun, RunStatus, Task, TaskClass};
use procrun_storage::{LogsRepo, RunsRepo, Tx};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DriverError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct TaskEvent {
    name: String,
    ok: bool,
}

enum LogEvent {
    TaskCompleted { task: String, line: String },
    TaskFailed { task: String, line: String },
    NoExecutor { class: String, line: String },
}

/// Where the driver's log lines go. The production sink
/// ([`TxLogSink`]) writes through the run's owning transaction; tests use
/// an in-memory sink so the dependency-ordering/cancellation logic in
/// [`run_tasks`] can be exercised with [`procrun_adapters::FakeExecutor`]
/// without a live Postgres instance.
#[async_trait]
trait LogSink: Send {
    async fn append(&mut self, run_id: Uuid, line: &str);
}

struct TxLogSink<'a> {
    tx: &'a mut Tx,
}

#[async_trait]
impl<'a> LogSink for TxLogSink<'a> {
    async fn append(&mut self, run_id: Uuid, line: &str) {
        if let Err(err) = LogsRepo::append_tx(self.tx, run_id, line).await {
            warn!(%run_id, error = %err, "failed to append run log line");
        }
    }
}

pub struct RunDriver<C: Clock> {
    registry: Arc<ExecutorRegistry>,
    clock: C,
}

impl<C: Clock> RunDriver<C> {
    pub fn new(registry: Arc<ExecutorRegistry>, clock: C) -> Self {
        Self { registry, clock }
    }

    /// Execute `definition` as run `run_id` to completion, inside `tx` —
    /// the same Serializable transaction the caller is using for its own
    /// message/file idempotency bookkeeping. The whole run, including
    /// every log line it writes and its terminal status, commits or rolls
    /// back as one unit with that bookkeeping; nothing about this run is
    /// visible to another connection until the caller's transaction
    /// commits.
    pub async fn execute(
        &self,
        tx: &mut Tx,
        run_id: Uuid,
        definition: &ProcessDefinition,
        cancel: CancellationToken,
    ) -> Result<RunStatus, DriverError> {
        let started_at = self.clock.now();
        let run = ProcessRun::new(run_id, definition.clone(), started_at);
        RunsRepo::insert(tx, &run).await?;

        let mut sink = TxLogSink { tx };
        let status = run_tasks(&mut sink, &self.registry, run_id, definition, cancel).await;

        let ended_at = self.clock.now();
        RunsRepo::update_status(sink.tx, run_id, status, Some(ended_at)).await?;
        Ok(status)
    }
}

async fn run_tasks<S: LogSink>(
    sink: &mut S,
    registry: &Arc<ExecutorRegistry>,
    run_id: Uuid,
    definition: &ProcessDefinition,
    cancel: CancellationToken,
) -> RunStatus {
    let (event_tx, _) = broadcast::channel::<TaskEvent>(EVENT_CHANNEL_CAPACITY);
    let (log_tx, mut log_rx) = mpsc::unbounded_channel::<LogEvent>();

    let task_futures: Vec<_> = definition
        .tasks
        .iter()
        .map(|task| {
            let task = task.clone();
            let wait_for: HashSet<String> = task.wait_for.iter().cloned().collect();
            let rx = event_tx.subscribe();
            let event_tx = event_tx.clone();
            let registry = Arc::clone(registry);
            let cancel = cancel.clone();
            let log_tx = log_tx.clone();
            async move { run_task(&registry, &task, wait_for, rx, event_tx, cancel, log_tx).await }
        })
        .collect();
    drop(log_tx);

    let (results, ()) = tokio::join!(
        join_all(task_futures),
        drain_logs(sink, run_id, &mut log_rx)
    );

    let any_failed = results.iter().any(Result::is_err);

    if cancel.is_cancelled() {
        RunStatus::Stopped
    } else if any_failed {
        RunStatus::Failed
    } else {
        RunStatus::Completed
    }
}

async fn drain_logs<S: LogSink>(
    sink: &mut S,
    run_id: Uuid,
    rx: &mut mpsc::UnboundedReceiver<LogEvent>,
) {
    while let Some(event) = rx.recv().await {
        let line = match &event {
            LogEvent::TaskCompleted { task, line } => {
                info!(%run_id, task = %task, "task completed");
                line
            }
            LogEvent::TaskFailed { task, line } => {
                warn!(%run_id, task = %task, "task failed");
                line
            }
            LogEvent::NoExecutor { class, line } => {
                warn!(%run_id, class = %class, "no executor registered");
                line
            }
        };
        sink.append(run_id, line).await;
    }
}

/// Run a single task once its dependencies resolve. Returns `Err(name)` if
/// the task itself failed or was skipped because a dependency failed.
async fn run_task(
    registry: &Arc<ExecutorRegistry>,
    task: &Task,
    mut pending: HashSet<String>,
    mut rx: broadcast::Receiver<TaskEvent>,
    tx: broadcast::Sender<TaskEvent>,
    cancel: CancellationToken,
    log_tx: mpsc::UnboundedSender<LogEvent>,
) -> Result<(), String> {
    let mut upstream_failed = false;

    while !pending.is_empty() {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = tx.send(TaskEvent { name: task.name.clone(), ok: false });
                return Err(task.name.clone());
            }
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if pending.remove(&event.name) && !event.ok {
                            upstream_failed = true;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    if upstream_failed || cancel.is_cancelled() {
        let _ = tx.send(TaskEvent {
            name: task.name.clone(),
            ok: false,
        });
        return Err(task.name.clone());
    }

    let outcome = execute_one(registry, task, cancel.clone(), &log_tx).await;
    let ok = outcome.is_ok();
    let _ = tx.send(TaskEvent {
        name: task.name.clone(),
        ok,
    });
    outcome.map_err(|_| task.name.clone())
}

async fn execute_one(
    registry: &Arc<ExecutorRegistry>,
    task: &Task,
    cancel: CancellationToken,
    log_tx: &mpsc::UnboundedSender<LogEvent>,
) -> Result<(), DriverError> {
    let Some(class) = TaskClass::parse_loose(&task.class) else {
        let line = format!("No executor registered for class type: {}", task.class);
        let _ = log_tx.send(LogEvent::NoExecutor {
            class: task.class.clone(),
            line,
        });
        return Err(DriverError::UnknownClass(task.class.clone()));
    };

    let Some(executor) = registry.get(class) else {
        let line = format!("No executor registered for class type: {}", task.class);
        let _ = log_tx.send(LogEvent::NoExecutor {
            class: task.class.clone(),
            line,
        });
        return Err(DriverError::NoExecutor(task.class.clone()));
    };

    match executor.execute(task, cancel).await {
        Ok(()) => {
            let line = format!("Task {} completed", task.name);
            let _ = log_tx.send(LogEvent::TaskCompleted {
                task: task.name.clone(),
                line,
            });
            Ok(())
        }
        Err(err) => {
            let line = format!("Failed to run task {}: {}", task.name, err);
            let _ = log_tx.send(LogEvent::TaskFailed {
                task: task.name.clone(),
                line,
            });
            Err(DriverError::TaskFailed(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procrun_adapters::{ExecutorRegistry as Registry, FakeExecutor};
    use std::collections::HashMap;

    struct RecordingSink {
        lines: Vec<String>,
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn append(&mut self, _run_id: Uuid, line: &str) {
            self.lines.push(line.to_string());
        }
    }

    fn task(name: &str, wait_for: &[&str]) -> Task {
        Task {
            name: name.into(),
            class: "localCmd".into(),
            parameters: HashMap::from([("command".to_string(), "true".to_string())]),
            wait_for: wait_for.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn registry_with(executor: FakeExecutor) -> Arc<Registry> {
        let mut registry = Registry::new();
        registry.register(TaskClass::LocalCmd, Arc::new(executor.clone()));
        registry.register(TaskClass::SshCmd, Arc::new(executor.clone()));
        registry.register(TaskClass::ScpCmd, Arc::new(executor));
        Arc::new(registry)
    }

    fn def(tasks: Vec<Task>) -> ProcessDefinition {
        ProcessDefinition {
            name: "p".into(),
            params: vec![],
            tasks,
        }
    }

    #[tokio::test]
    async fn independent_tasks_all_run() {
        let exec = FakeExecutor::new();
        let registry = registry_with(exec.clone());
        let definition = def(vec![task("a", &[]), task("b", &[])]);
        let mut sink = RecordingSink { lines: vec![] };

        let status = run_tasks(
            &mut sink,
            &registry,
            Uuid::new_v4(),
            &definition,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(status, RunStatus::Completed);
        let mut calls = exec.calls();
        calls.sort();
        assert_eq!(calls, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn dependent_task_waits_for_upstream() {
        let exec = FakeExecutor::new();
        let registry = registry_with(exec.clone());
        let definition = def(vec![task("a", &[]), task("b", &["a"])]);
        let mut sink = RecordingSink { lines: vec![] };

        let status = run_tasks(
            &mut sink,
            &registry,
            Uuid::new_v4(),
            &definition,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(status, RunStatus::Completed);
        assert_eq!(exec.calls(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn dependency_failure_skips_dependent_task() {
        let exec = FakeExecutor::new();
        exec.fail_task("a");
        let registry = registry_with(exec.clone());
        let definition = def(vec![task("a", &[]), task("b", &["a"])]);
        let mut sink = RecordingSink { lines: vec![] };

        let status = run_tasks(
            &mut sink,
            &registry,
            Uuid::new_v4(),
            &definition,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(status, RunStatus::Failed);
        assert_eq!(exec.calls(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn already_cancelled_token_stops_the_run() {
        let exec = FakeExecutor::new();
        let registry = registry_with(exec.clone());
        let definition = def(vec![task("a", &[])]);
        let mut sink = RecordingSink { lines: vec![] };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let status = run_tasks(&mut sink, &registry, Uuid::new_v4(), &definition, cancel).await;

        assert_eq!(status, RunStatus::Stopped);
    }

    #[tokio::test]
    async fn unknown_class_is_logged_and_fails_the_run() {
        let exec = FakeExecutor::new();
        let registry = registry_with(exec.clone());
        let mut bogus = task("a", &[]);
        bogus.class = "dockerExec".into();
        let definition = def(vec![bogus]);
        let mut sink = RecordingSink { lines: vec![] };

        let status = run_tasks(
            &mut sink,
            &registry,
            Uuid::new_v4(),
            &definition,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(status, RunStatus::Failed);
        assert!(sink
            .lines
            .iter()
            .any(|l| l.contains("No executor registered")));
    }
}
