// SPDX-License-Identifier: MIT

//! Validation for process definitions.
//!
//! Mirrors the order of checks a loader/producer must apply before a
//! definition is allowed onto the bus: name, then per-task shape, then
//! per-param shape, then cross-task `waitFor` references. The first
//! violation short-circuits with a stable, literal message so callers and
//! tests can match on it directly.

use crate::model::{ProcessDefinition, TaskClass};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("process name must not be blank")]
    BlankName,
    #[error("task name must not be blank")]
    BlankTaskName,
    #[error("task '{0}' has a blank class")]
    BlankTaskClass(String),
    #[error("unknown task class '{class}' for task '{task}'")]
    UnknownTaskClass { task: String, class: String },
    #[error("duplicate task name found: {0}")]
    DuplicateTaskName(String),
    #[error("task '{0}' cannot wait for itself")]
    SelfDependency(String),
    #[error("param name must not be blank")]
    BlankParamName,
    #[error("duplicate param name found: {0}")]
    DuplicateParamName(String),
    #[error("task '{task}' waits for unknown task '{unknown}'")]
    UnknownDependency { task: String, unknown: String },
    #[error("missing mandatory parameters: {0}")]
    MissingMandatoryParams(String),
}

/// Validate structural invariants of a definition (§4.6, steps 1-4).
///
/// Also normalizes each task's `class` to its canonical on-storage spelling
/// (e.g. `LOCALCMD` → `localCmd`) in place — class is accepted
/// case-insensitively on input but must never be persisted or echoed back
/// in anything but canonical case, so normalization happens here rather
/// than being left to each caller to remember.
///
/// Does not consult any externally supplied parameter values — see
/// [`validate_mandatory_params`] for that.
pub fn validate(def: &mut ProcessDefinition) -> Result<(), ValidationError> {
    if def.name.trim().is_empty() {
        return Err(ValidationError::BlankName);
    }

    let mut seen_tasks: HashSet<String> = HashSet::new();
    for task in &mut def.tasks {
        if task.name.trim().is_empty() {
            return Err(ValidationError::BlankTaskName);
        }
        if task.class.trim().is_empty() {
            return Err(ValidationError::BlankTaskClass(task.name.clone()));
        }
        let class = TaskClass::parse_loose(&task.class).ok_or_else(|| {
            ValidationError::UnknownTaskClass {
                task: task.name.clone(),
                class: task.class.clone(),
            }
        })?;
        task.class = class.as_str().to_string();
        if !seen_tasks.insert(task.name.clone()) {
            return Err(ValidationError::DuplicateTaskName(task.name.clone()));
        }
        if task.wait_for.iter().any(|dep| dep == &task.name) {
            return Err(ValidationError::SelfDependency(task.name.clone()));
        }
    }

    let mut seen_params: HashSet<&str> = HashSet::new();
    for param in &def.params {
        if param.name.trim().is_empty() {
            return Err(ValidationError::BlankParamName);
        }
        if !seen_params.insert(param.name.as_str()) {
            return Err(ValidationError::DuplicateParamName(param.name.clone()));
        }
    }

    let known_tasks: HashSet<&str> = def.tasks.iter().map(|t| t.name.as_str()).collect();
    for task in &def.tasks {
        for dep in &task.wait_for {
            if !known_tasks.contains(dep.as_str()) {
                return Err(ValidationError::UnknownDependency {
                    task: task.name.clone(),
                    unknown: dep.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Collect mandatory params absent or blank in `user_params` and fail with
/// a single comma-joined message if any are missing.
pub fn validate_mandatory_params(
    def: &ProcessDefinition,
    user_params: &HashMap<String, String>,
) -> Result<(), ValidationError> {
    let missing: Vec<&str> = def
        .params
        .iter()
        .filter(|p| p.mandatory)
        .filter(|p| {
            user_params
                .get(&p.name)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|p| p.name.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingMandatoryParams(missing.join(", ")))
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
