// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process lifecycle supervisor shared by the loader, producer, and
//! consumer binaries (SPEC_FULL.md §4.9, §9).
//!
//! Each binary spawns its long-running tasks (HTTP server, bus consumer,
//! file-scan ticker, ...) through one [`Supervisor`]. The first task to
//! return an error, or either of SIGINT/SIGTERM, cancels the shared root
//! token; every other supervised task is expected to observe that token
//! and wind down. `run()` does not return until all tasks have finished.

use std::fmt;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("task '{name}' failed: {source}")]
    TaskFailed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("task '{0}' panicked")]
    TaskPanicked(String),
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Running,
    Draining,
    Terminated,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Running => "running",
            SupervisorState::Draining => "draining",
            SupervisorState::Terminated => "terminated",
        };
        write!(f, "{s}")
    }
}

type TaskResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A supervised long-running task future.
pub trait SupervisedFuture:
    std::future::Future<Output = TaskResult> + Send + 'static
{
}
impl<T> SupervisedFuture for T where T: std::future::Future<Output = TaskResult> + Send + 'static {}

pub struct Supervisor {
    cancel: CancellationToken,
    tasks: JoinSet<(String, TaskResult)>,
    state: SupervisorState,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
            state: SupervisorState::Idle,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// The token every supervised task should select against to know when
    /// to shut down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn a named task. `make` receives the shared cancellation token
    /// so the task can react to shutdown without polling supervisor state.
    pub fn spawn<F, Fut>(&mut self, name: impl Into<String>, make: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: SupervisedFuture,
    {
        let name = name.into();
        self.state = SupervisorState::Running;
        let fut = make(self.cancel.clone());
        let task_name = name.clone();
        self.tasks.spawn(async move { (task_name, fut.await) });
    }

    /// Drive every supervised task to completion, cancelling the rest as
    /// soon as one fails or a termination signal arrives. Returns the
    /// first error seen, if any (first-error-wins).
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let mut sigterm = signal(SignalKind::terminate()).map_err(SupervisorError::Signal)?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(SupervisorError::Signal)?;
        let mut first_error: Option<SupervisorError> = None;

        loop {
            if self.tasks.is_empty() {
                break;
            }

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("received SIGTERM, draining");
                    self.begin_drain();
                }
                _ = sigint.recv() => {
                    info!("received SIGINT, draining");
                    self.begin_drain();
                }
                Some(joined) = self.tasks.join_next() => {
                    match joined {
                        Ok((name, Ok(()))) => {
                            info!(task = %name, "supervised task exited cleanly");
                        }
                        Ok((name, Err(source))) => {
                            error!(task = %name, error = %source, "supervised task failed");
                            if first_error.is_none() {
                                first_error = Some(SupervisorError::TaskFailed { name, source });
                            }
                            self.begin_drain();
                        }
                        Err(join_err) => {
                            let name = if join_err.is_cancelled() { "cancelled".to_string() } else { "unknown".to_string() };
                            warn!(task = %name, error = %join_err, "supervised task panicked or was aborted");
                            if first_error.is_none() {
                                first_error = Some(SupervisorError::TaskPanicked(name));
                            }
                            self.begin_drain();
                        }
                    }
                }
            }
        }

        self.state = SupervisorState::Terminated;
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn begin_drain(&mut self) {
        if self.state != SupervisorState::Draining {
            self.state = SupervisorState::Draining;
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn clean_exit_of_all_tasks_yields_ok() {
        let mut sup = Supervisor::new();
        sup.spawn("a", |_cancel| async { Ok(()) });
        sup.spawn("b", |_cancel| async { Ok(()) });
        let result = sup.run().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn one_task_failing_cancels_the_rest() {
        let mut sup = Supervisor::new();
        let observed_cancel = Arc::new(AtomicBool::new(false));
        let observed_cancel2 = observed_cancel.clone();

        sup.spawn("failing", |_cancel| async {
            Err("boom".into())
        });
        sup.spawn("long_runner", move |cancel| {
            let observed = observed_cancel2;
            async move {
                cancel.cancelled().await;
                observed.store(true, Ordering::SeqCst);
                Ok(())
            }
        });

        let result = sup.run().await;
        assert!(result.is_err());
        assert!(observed_cancel.load(Ordering::SeqCst));
    }
}
