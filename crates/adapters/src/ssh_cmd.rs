// SPDX-License-Identifier: MIT

//! `sshCmd` executor: runs a command on a remote host over SSH.
//!
//! `ssh2` is synchronous, so the session lives entirely inside a
//! `spawn_blocking` task. A short session timeout ([`POLL_INTERVAL`]) makes
//! every blocking read return periodically instead of hanging until the
//! remote side closes the channel; each time it returns, the read loop
//! checks the cancellation token and, if cancelled, closes the channel and
//! disconnects the session before returning — the remote command is killed
//! rather than left running to completion.

use crate::executor::{ExecuteError, Executor};
use async_trait::async_trait;
use procrun_core::Task;
use ssh2::Session;
use std::io::Read;
use std::net::TcpStream;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct SshCmdExecutor;

fn required<'a>(task: &'a Task, key: &str) -> Result<&'a str, ExecuteError> {
    task.parameters
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ExecuteError::MissingParameter {
            task: task.name.clone(),
            param: key.into(),
        })
}

fn is_retryable_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

/// Authenticate with key-file auth if `keyPath` is present, otherwise
/// password auth. Key takes priority over password when both are set.
fn authenticate(session: &Session, task: &Task, user: &str) -> Result<(), ExecuteError> {
    if let Some(key_path) = task.parameters.get("keyPath") {
        session
            .userauth_pubkey_file(user, None, std::path::Path::new(key_path), None)
            .map_err(|e| ExecuteError::Ssh(e.to_string()))
    } else if let Some(password) = task.parameters.get("password") {
        session
            .userauth_password(user, password)
            .map_err(|e| ExecuteError::Ssh(e.to_string()))
    } else {
        Err(ExecuteError::MissingCredentials)
    }
}

fn run_blocking(task: Task, cancel: CancellationToken) -> Result<(), ExecuteError> {
    let host = required(&task, "host")?.to_string();
    let user = required(&task, "user")?.to_string();
    let command = required(&task, "command")?.to_string();
    let port = task
        .parameters
        .get("port")
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(22);

    let tcp = TcpStream::connect_timeout(
        &format!("{host}:{port}")
            .parse()
            .map_err(|e| ExecuteError::Ssh(format!("invalid address: {e}")))?,
        DIAL_TIMEOUT,
    )
    .map_err(|e| ExecuteError::Io(e.to_string()))?;

    let mut session = Session::new().map_err(|e| ExecuteError::Ssh(e.to_string()))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(POLL_INTERVAL.as_millis() as u32);
    session
        .handshake()
        .map_err(|e| ExecuteError::Ssh(e.to_string()))?;
    authenticate(&session, &task, &user)?;

    if cancel.is_cancelled() {
        let _ = session.disconnect(None, "cancelled", None);
        return Err(ExecuteError::Cancelled);
    }

    let mut channel = session
        .channel_session()
        .map_err(|e| ExecuteError::Ssh(e.to_string()))?;
    channel
        .exec(&command)
        .map_err(|e| ExecuteError::Ssh(e.to_string()))?;

    let mut output = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        if cancel.is_cancelled() {
            let _ = channel.close();
            let _ = session.disconnect(None, "cancelled", None);
            return Err(ExecuteError::Cancelled);
        }
        match channel.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => output.extend_from_slice(&buf[..n]),
            Err(e) if is_retryable_timeout(&e) => continue,
            Err(e) => return Err(ExecuteError::Io(e.to_string())),
        }
    }

    channel
        .wait_close()
        .map_err(|e| ExecuteError::Ssh(e.to_string()))?;

    match channel.exit_status() {
        Ok(0) => Ok(()),
        Ok(code) => Err(ExecuteError::NonZeroExit(code)),
        Err(e) => Err(ExecuteError::Ssh(e.to_string())),
    }
}

#[async_trait]
impl Executor for SshCmdExecutor {
    async fn execute(&self, task: &Task, cancel: CancellationToken) -> Result<(), ExecuteError> {
        let task = task.clone();
        let cancel_for_blocking = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || run_blocking(task, cancel_for_blocking));

        match handle.await {
            Ok(inner) => inner,
            Err(_join_err) => Err(ExecuteError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn missing_host_is_rejected() {
        let exec = SshCmdExecutor;
        let task = Task {
            name: "t".into(),
            class: "sshCmd".into(),
            parameters: HashMap::from([
                ("user".to_string(), "root".to_string()),
                ("command".to_string(), "true".to_string()),
            ]),
            wait_for: vec![],
        };
        let result = exec.execute(&task, CancellationToken::new()).await;
        assert!(
            matches!(result, Err(ExecuteError::MissingParameter { ref param, .. }) if param == "host")
        );
    }

    #[tokio::test]
    async fn missing_credentials_message_is_literal() {
        let task = Task {
            name: "t".into(),
            class: "sshCmd".into(),
            parameters: HashMap::from([
                ("host".to_string(), "127.0.0.1".to_string()),
                ("user".to_string(), "root".to_string()),
                ("command".to_string(), "true".to_string()),
            ]),
            wait_for: vec![],
        };
        let result = tokio::task::spawn_blocking(move || run_blocking(task, CancellationToken::new()))
            .await
            .unwrap();
        // No TCP listener on 127.0.0.1:22 in CI is also a plausible failure
        // mode; either an IO/connect failure or the missing-credential
        // rejection is acceptable here, but if it is the credential
        // rejection, it must carry the exact documented wording.
        if let Err(ExecuteError::MissingCredentials) = result {
            assert_eq!(
                ExecuteError::MissingCredentials.to_string(),
                "either password or keyPath must be provided"
            );
        }
    }
}
