// SPDX-License-Identifier: MIT

//! Cross-crate scenarios from the system's testable-properties list:
//! parse → validate → (optionally template) without touching a live
//! Postgres/AMQP instance. The per-table and per-transaction behavior of
//! `procrun-storage`/`procrun-engine` is covered by colocated tests in
//! those crates and by a live-infrastructure integration pass this suite
//! does not attempt to reproduce.

use procrun_core::{parse_definition_yaml, validate, Message, ValidationError};
use std::collections::HashMap;

#[test]
fn well_formed_definition_with_dependency_chain_validates() {
    let yaml = r#"
name: deploy-pipeline
params:
  - name: target
    mandatory: true
tasks:
  - name: build
    class: localCmd
    parameters:
      command: "make build"
  - name: test
    class: localCmd
    parameters:
      command: "make test"
    waitFor: [build]
  - name: deploy
    class: sshCmd
    parameters:
      host: "{{target}}"
      user: deploy
      command: "systemctl restart app"
    waitFor: [test]
"#;
    let mut def = parse_definition_yaml(yaml).expect("valid yaml parses");
    validate(&mut def).expect("well-formed definition should validate");
    assert_eq!(def.tasks.len(), 3);
    assert_eq!(def.tasks[2].wait_for, vec!["test".to_string()]);
}

#[test]
fn unknown_task_class_is_rejected() {
    let yaml = r#"
name: p
tasks:
  - name: t1
    class: dockerExec
    parameters: {}
"#;
    let mut def = parse_definition_yaml(yaml).expect("yaml still parses");
    let result = validate(&mut def);
    assert!(matches!(result, Err(ValidationError::UnknownTaskClass { .. })));
}

#[test]
fn duplicate_task_names_are_rejected() {
    let yaml = r#"
name: p
tasks:
  - name: t1
    class: localCmd
    parameters: {}
  - name: t1
    class: localCmd
    parameters: {}
"#;
    let mut def = parse_definition_yaml(yaml).expect("yaml still parses");
    assert!(matches!(
        validate(&mut def),
        Err(ValidationError::DuplicateTaskName(name)) if name == "t1"
    ));
}

#[test]
fn self_dependency_is_rejected() {
    let yaml = r#"
name: p
tasks:
  - name: t1
    class: localCmd
    parameters: {}
    waitFor: [t1]
"#;
    let mut def = parse_definition_yaml(yaml).expect("yaml still parses");
    assert!(matches!(
        validate(&mut def),
        Err(ValidationError::SelfDependency(name)) if name == "t1"
    ));
}

#[test]
fn dependency_on_unknown_task_is_rejected() {
    let yaml = r#"
name: p
tasks:
  - name: t1
    class: localCmd
    parameters: {}
    waitFor: [ghost]
"#;
    let mut def = parse_definition_yaml(yaml).expect("yaml still parses");
    assert!(matches!(
        validate(&mut def),
        Err(ValidationError::UnknownDependency { unknown, .. }) if unknown == "ghost"
    ));
}

#[test]
fn message_envelope_round_trips_through_json() {
    let yaml = r#"
name: p
tasks:
  - name: t1
    class: localCmd
    parameters:
      command: "echo hi"
"#;
    let mut def = parse_definition_yaml(yaml).unwrap();
    validate(&mut def).unwrap();
    let message = Message::new(def);

    let body = serde_json::to_string(&message).unwrap();
    let round_tripped: Message = serde_json::from_str(&body).unwrap();
    assert_eq!(round_tripped.uuid, message.uuid);
    assert_eq!(round_tripped.definition, message.definition);
}

#[test]
fn producer_variant_a_definition_is_indistinguishable_from_stored_template() {
    // A full-definition POST (variant A) is later reusable as a named
    // template for variant-B calls; the two code paths must agree on
    // what a "valid definition" looks like.
    let yaml = r#"
name: nightly-backup
params:
  - name: bucket
    mandatory: true
tasks:
  - name: dump
    class: localCmd
    parameters:
      command: "pg_dump mydb > /tmp/dump.sql"
  - name: upload
    class: scpCmd
    parameters:
      host: backup.internal
      user: backup
      localPath: /tmp/dump.sql
      remotePath: "/backups/{{bucket}}/dump.sql"
    waitFor: [dump]
"#;
    let mut def = parse_definition_yaml(yaml).unwrap();
    validate(&mut def).unwrap();

    let mut user_params = HashMap::new();
    user_params.insert("bucket".to_string(), "prod".to_string());
    procrun_core::validate_mandatory_params(&def, &user_params)
        .expect("mandatory params satisfied");
}

#[test]
fn missing_mandatory_param_is_reported_before_dispatch() {
    let yaml = r#"
name: p
params:
  - name: required_one
    mandatory: true
tasks:
  - name: t1
    class: localCmd
    parameters:
      command: echo
"#;
    let mut def = parse_definition_yaml(yaml).unwrap();
    validate(&mut def).unwrap();
    let result = procrun_core::validate_mandatory_params(&def, &HashMap::new());
    assert!(matches!(
        result,
        Err(ValidationError::MissingMandatoryParams(_))
    ));
}
