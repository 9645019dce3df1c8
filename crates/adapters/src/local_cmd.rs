// SPDX-License-Identifier: MIT

//! `localCmd` executor: runs a shell command on the local machine.
//!
//! Built on the same timeout-wrapped `Command::output` pattern as the
//! teacher's subprocess helper, generalized from a handful of fixed
//! per-purpose timeouts to one configurable timeout per task.

use crate::executor::{ExecuteError, Executor};
use async_trait::async_trait;
use procrun_core::Task;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

pub struct LocalCmdExecutor {
    timeout: Duration,
}

impl Default for LocalCmdExecutor {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LocalCmdExecutor {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Executor for LocalCmdExecutor {
    async fn execute(&self, task: &Task, cancel: CancellationToken) -> Result<(), ExecuteError> {
        let command = task.parameters.get("command").ok_or_else(|| {
            ExecuteError::MissingParameter {
                task: task.name.clone(),
                param: "command".into(),
            }
        })?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        let mut child = cmd.spawn().map_err(|e| ExecuteError::Io(e.to_string()))?;

        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                Err(ExecuteError::Cancelled)
            }
            result = tokio::time::timeout(self.timeout, child.wait()) => {
                match result {
                    Ok(Ok(status)) if status.success() => Ok(()),
                    Ok(Ok(status)) => Err(ExecuteError::NonZeroExit(status.code().unwrap_or(-1))),
                    Ok(Err(e)) => Err(ExecuteError::Io(e.to_string())),
                    Err(_elapsed) => Err(ExecuteError::Timeout(self.timeout.as_secs())),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn task(command: &str) -> Task {
        Task {
            name: "t".into(),
            class: "localCmd".into(),
            parameters: HashMap::from([("command".to_string(), command.to_string())]),
            wait_for: vec![],
        }
    }

    #[tokio::test]
    async fn runs_successful_command() {
        let exec = LocalCmdExecutor::default();
        let result = exec.execute(&task("true"), CancellationToken::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn reports_nonzero_exit() {
        let exec = LocalCmdExecutor::default();
        let result = exec.execute(&task("false"), CancellationToken::new()).await;
        assert!(matches!(result, Err(ExecuteError::NonZeroExit(_))));
    }

    #[tokio::test]
    async fn missing_command_parameter_is_rejected() {
        let exec = LocalCmdExecutor::default();
        let task = Task {
            name: "t".into(),
            class: "localCmd".into(),
            parameters: HashMap::new(),
            wait_for: vec![],
        };
        let result = exec.execute(&task, CancellationToken::new()).await;
        assert!(matches!(result, Err(ExecuteError::MissingParameter { .. })));
    }

    #[tokio::test]
    async fn missing_command_parameter_message_is_literal() {
        let exec = LocalCmdExecutor::default();
        let task = Task {
            name: "build".into(),
            class: "localCmd".into(),
            parameters: HashMap::new(),
            wait_for: vec![],
        };
        let err = exec
            .execute(&task, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing 'command' parameter in task \"build\""
        );
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let exec = LocalCmdExecutor::default();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel2.cancel();
        });
        let result = exec.execute(&task("sleep 5"), cancel).await;
        assert!(matches!(result, Err(ExecuteError::Cancelled)));
    }
}
