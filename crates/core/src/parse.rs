// SPDX-License-Identifier: MIT

//! YAML parsing of process definitions.
//!
//! Shared by the loader (reading files off disk) and the producer (reading
//! a stored definition template by name before templating it).

use crate::model::ProcessDefinition;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub fn parse_definition_yaml(contents: &str) -> Result<ProcessDefinition, ParseError> {
    Ok(serde_yaml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_definition() {
        let yaml = r#"
name: p
tasks:
  - name: t1
    class: localCmd
    parameters:
      command: "echo ok"
"#;
        let def = parse_definition_yaml(yaml).unwrap();
        assert_eq!(def.name, "p");
        assert_eq!(def.tasks.len(), 1);
        assert_eq!(def.tasks[0].parameters.get("command").unwrap(), "echo ok");
    }

    #[test]
    fn parses_task_with_wait_for() {
        let yaml = r#"
name: p
tasks:
  - name: a
    class: localCmd
    parameters: {}
  - name: b
    class: localCmd
    parameters: {}
    waitFor: [a]
"#;
        let def = parse_definition_yaml(yaml).unwrap();
        assert_eq!(def.tasks[1].wait_for, vec!["a".to_string()]);
    }

    #[test]
    fn rejects_invalid_yaml() {
        let result = parse_definition_yaml("not: [valid");
        assert!(result.is_err());
    }
}
