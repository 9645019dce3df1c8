// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no executor registered for class type: {0}")]
    NoExecutor(String),
    #[error("storage error: {0}")]
    Storage(#[from] procrun_storage::StorageError),
    #[error("unknown task class: {0}")]
    UnknownClass(String),
    #[error("task failed: {0}")]
    TaskFailed(String),
}
