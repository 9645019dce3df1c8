// SPDX-License-Identifier: MIT

//! Variant-B `POST /startProcess`: fill a stored definition's task
//! parameter values from caller-supplied `parameters` using Handlebars
//! templates (SPEC_FULL.md §4.3).
//!
//! Each task parameter value in the stored template may contain `{{name}}`
//! placeholders referring to the process's own declared `params`; mandatory
//! params are checked before rendering so a missing required value is
//! reported as a validation error rather than rendering an empty string.

use handlebars::Handlebars;
use procrun_core::{validate, validate_mandatory_params, ProcessDefinition, ValidationError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("parameter validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("template render error in task '{task}' parameter '{param}': {source}")]
    Render {
        task: String,
        param: String,
        #[source]
        source: handlebars::RenderError,
    },
}

/// Render `template.tasks[*].parameters` against `user_params`, returning a
/// fully-materialized definition ready to publish.
pub fn render(
    template: &ProcessDefinition,
    user_params: &HashMap<String, String>,
) -> Result<ProcessDefinition, TemplateError> {
    validate_mandatory_params(template, user_params)?;

    let hb = Handlebars::new();
    let mut rendered = template.clone();
    for task in &mut rendered.tasks {
        for (key, value) in task.parameters.iter_mut() {
            let filled = hb
                .render_template(value, user_params)
                .map_err(|source| TemplateError::Render {
                    task: task.name.clone(),
                    param: key.clone(),
                    source,
                })?;
            *value = filled;
        }
    }
    validate(&mut rendered)?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use procrun_core::{Param, Task};

    fn template() -> ProcessDefinition {
        ProcessDefinition {
            name: "deploy".into(),
            params: vec![Param {
                name: "target".into(),
                mandatory: true,
                description: String::new(),
                def_value: None,
            }],
            tasks: vec![Task {
                name: "run".into(),
                class: "localCmd".into(),
                parameters: HashMap::from([(
                    "command".to_string(),
                    "deploy --to {{target}}".to_string(),
                )]),
                wait_for: vec![],
            }],
        }
    }

    #[test]
    fn renders_placeholders_from_user_params() {
        let params = HashMap::from([("target".to_string(), "prod".to_string())]);
        let result = render(&template(), &params).unwrap();
        assert_eq!(
            result.tasks[0].parameters.get("command").unwrap(),
            "deploy --to prod"
        );
    }

    #[test]
    fn missing_mandatory_param_is_rejected() {
        let result = render(&template(), &HashMap::new());
        assert!(matches!(result, Err(TemplateError::Validation(_))));
    }

    #[test]
    fn rendered_definition_is_fully_validated_before_publish() {
        let mut bad = template();
        bad.tasks[0].class = "dockerExec".into();
        let params = HashMap::from([("target".to_string(), "prod".to_string())]);
        let result = render(&bad, &params);
        assert!(matches!(
            result,
            Err(TemplateError::Validation(ValidationError::UnknownTaskClass { .. }))
        ));
    }
}
