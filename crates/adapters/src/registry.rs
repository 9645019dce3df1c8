// SPDX-License-Identifier: MIT

//! Maps a task's class string to its [`Executor`].

use crate::executor::Executor;
use crate::{LocalCmdExecutor, ScpCmdExecutor, SshCmdExecutor};
use procrun_core::TaskClass;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<TaskClass, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry wired with the three built-in executors
    /// (SPEC_FULL.md §3 `TaskClass`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TaskClass::LocalCmd, Arc::new(LocalCmdExecutor::default()));
        registry.register(TaskClass::SshCmd, Arc::new(SshCmdExecutor));
        registry.register(TaskClass::ScpCmd, Arc::new(ScpCmdExecutor));
        registry
    }

    pub fn register(&mut self, class: TaskClass, executor: Arc<dyn Executor>) {
        self.executors.insert(class, executor);
    }

    pub fn get(&self, class: TaskClass) -> Option<Arc<dyn Executor>> {
        self.executors.get(&class).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_three_classes() {
        let registry = ExecutorRegistry::with_defaults();
        assert!(registry.get(TaskClass::LocalCmd).is_some());
        assert!(registry.get(TaskClass::SshCmd).is_some());
        assert!(registry.get(TaskClass::ScpCmd).is_some());
    }
}
