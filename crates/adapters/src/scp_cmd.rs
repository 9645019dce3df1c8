// SPDX-License-Identifier: MIT

//! `scpCmd` executor: uploads a local file to a remote host over SFTP.
//!
//! Shares connection/auth plumbing with [`crate::ssh_cmd`] but drives an
//! SFTP channel instead of an exec channel. The upload is written in
//! chunks so a cancellation during a large transfer is noticed within one
//! [`POLL_INTERVAL`] rather than only after the whole file has been sent.

use crate::executor::{ExecuteError, Executor};
use async_trait::async_trait;
use procrun_core::Task;
use ssh2::Session;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(200);
const CHUNK_SIZE: usize = 64 * 1024;

pub struct ScpCmdExecutor;

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
    let local_path = required(&task, "localPath")?.to_string();
    let remote_path = required(&task, "remotePath")?.to_string();
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

    let mut contents = Vec::new();
    std::fs::File::open(&local_path)
        .map_err(|e| ExecuteError::Io(e.to_string()))?
        .read_to_end(&mut contents)
        .map_err(|e| ExecuteError::Io(e.to_string()))?;

    let sftp = session.sftp().map_err(|e| ExecuteError::Ssh(e.to_string()))?;
    let mut remote_file = sftp
        .create(std::path::Path::new(&remote_path))
        .map_err(|e| ExecuteError::Ssh(e.to_string()))?;

    for chunk in contents.chunks(CHUNK_SIZE) {
        if cancel.is_cancelled() {
            drop(remote_file);
            let _ = session.disconnect(None, "cancelled", None);
            return Err(ExecuteError::Cancelled);
        }
        loop {
            match remote_file.write_all(chunk) {
                Ok(()) => break,
                Err(e) if is_retryable_timeout(&e) => {
                    if cancel.is_cancelled() {
                        drop(remote_file);
                        let _ = session.disconnect(None, "cancelled", None);
                        return Err(ExecuteError::Cancelled);
                    }
                    continue;
                }
                Err(e) => return Err(ExecuteError::Io(e.to_string())),
            }
        }
    }

    Ok(())
}

#[async_trait]
impl Executor for ScpCmdExecutor {
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
    async fn missing_local_path_is_rejected() {
        let exec = ScpCmdExecutor;
        let task = Task {
            name: "t".into(),
            class: "scpCmd".into(),
            parameters: HashMap::from([
                ("host".to_string(), "127.0.0.1".to_string()),
                ("user".to_string(), "root".to_string()),
                ("remotePath".to_string(), "/tmp/out".to_string()),
            ]),
            wait_for: vec![],
        };
        let result = exec.execute(&task, CancellationToken::new()).await;
        assert!(
            matches!(result, Err(ExecuteError::MissingParameter { ref param, .. }) if param == "localPath")
        );
    }
}
