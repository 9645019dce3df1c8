// SPDX-License-Identifier: MIT

//! Fake executor for engine-level tests (not a live process/SSH target).

use crate::executor::{ExecuteError, Executor};
use async_trait::async_trait;
use parking_lot::Mutex;
use procrun_core::Task;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct FakeExecutor {
    calls: Arc<Mutex<Vec<String>>>,
    fail_tasks: Arc<Mutex<Vec<String>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_task(&self, name: impl Into<String>) {
        self.fail_tasks.lock().push(name.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(&self, task: &Task, cancel: CancellationToken) -> Result<(), ExecuteError> {
        if cancel.is_cancelled() {
            return Err(ExecuteError::Cancelled);
        }
        self.calls.lock().push(task.name.clone());
        if self.fail_tasks.lock().contains(&task.name) {
            Err(ExecuteError::NonZeroExit(1))
        } else {
            Ok(())
        }
    }
}
