// SPDX-License-Identifier: MIT

//! The executor trait each task class is dispatched to.

use async_trait::async_trait;
use procrun_core::Task;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("command failed with exit code {0}")]
    NonZeroExit(i32),
    #[error("command timed out after {0}s")]
    Timeout(u64),
    #[error("cancelled")]
    Cancelled,
    #[error("ssh error: {0}")]
    Ssh(String),
    #[error("missing '{param}' parameter in task \"{task}\"")]
    MissingParameter { task: String, param: String },
    #[error("either password or keyPath must be provided")]
    MissingCredentials,
    #[error("io error: {0}")]
    Io(String),
}

/// Runs a single [`Task`] to completion.
///
/// Implementations are looked up by [`procrun_core::TaskClass`] through
/// [`crate::registry::ExecutorRegistry`]; the run driver never knows which
/// concrete executor it is talking to.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, task: &Task, cancel: CancellationToken) -> Result<(), ExecuteError>;
}
