// SPDX-License-Identifier: MIT

//! Process definition: the declarative shape of a named workflow.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Discriminator selecting the executor a task is dispatched to.
///
/// Accepted case-insensitively on input (YAML/JSON), stored in canonical case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskClass {
    #[serde(rename = "localCmd")]
    LocalCmd,
    #[serde(rename = "sshCmd")]
    SshCmd,
    #[serde(rename = "scpCmd")]
    ScpCmd,
}

impl TaskClass {
    /// Canonical on-storage string for this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskClass::LocalCmd => "localCmd",
            TaskClass::SshCmd => "sshCmd",
            TaskClass::ScpCmd => "scpCmd",
        }
    }

    /// Parse a class name case-insensitively, as accepted from YAML/JSON input.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "localcmd" => Some(TaskClass::LocalCmd),
            "sshcmd" => Some(TaskClass::SshCmd),
            "scpcmd" => Some(TaskClass::ScpCmd),
            _ => None,
        }
    }
}

impl fmt::Display for TaskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single task within a process definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Raw class string as read from the definition; validated/normalized
    /// into a [`TaskClass`] by [`crate::validate::validate`].
    pub class: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default, rename = "waitFor")]
    pub wait_for: Vec<String>,
}

/// A parameter accepted by a process definition at launch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "defValue")]
    pub def_value: Option<String>,
}

/// A named, declarative workflow: ordered params and ordered, dependency-linked tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl ProcessDefinition {
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_class_parses_case_insensitively() {
        assert_eq!(TaskClass::parse_loose("LOCALCMD"), Some(TaskClass::LocalCmd));
        assert_eq!(TaskClass::parse_loose("SshCmd"), Some(TaskClass::SshCmd));
        assert_eq!(TaskClass::parse_loose("scpcmd"), Some(TaskClass::ScpCmd));
        assert_eq!(TaskClass::parse_loose("bogus"), None);
    }

    #[test]
    fn task_class_canonical_display() {
        assert_eq!(TaskClass::LocalCmd.to_string(), "localCmd");
        assert_eq!(TaskClass::SshCmd.to_string(), "sshCmd");
        assert_eq!(TaskClass::ScpCmd.to_string(), "scpCmd");
    }

    #[test]
    fn definition_finds_task_by_name() {
        let def = ProcessDefinition {
            name: "p".into(),
            params: vec![],
            tasks: vec![Task {
                name: "t1".into(),
                class: "localCmd".into(),
                parameters: HashMap::new(),
                wait_for: vec![],
            }],
        };
        assert!(def.task("t1").is_some());
        assert!(def.task("missing").is_none());
    }
}
