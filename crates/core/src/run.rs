// SPDX-License-Identifier: MIT

//! Process run: a single execution instance of a definition.

use crate::model::ProcessDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a process run.
///
/// Transitions only `Running -> {Completed, Failed, Stopped}`; there is no
/// re-entry into `Running` (SPEC_FULL.md §3, §8 status monotonicity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "stopped" => Ok(RunStatus::Stopped),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// A single execution instance of a [`ProcessDefinition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRun {
    pub id: Uuid,
    pub definition: ProcessDefinition,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ProcessRun {
    pub fn new(id: Uuid, definition: ProcessDefinition, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            definition,
            status: RunStatus::Running,
            started_at,
            ended_at: None,
        }
    }
}

/// Append-only log line attached to a process run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessLog {
    pub id: i64,
    pub process_id: Uuid,
    pub log: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Stopped.is_terminal());
    }

    #[test]
    fn round_trips_through_str() {
        for s in [
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Stopped,
        ] {
            let parsed: RunStatus = s.as_str().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }
}
