// SPDX-License-Identifier: MIT

//! HTTP client the loader uses to hand a parsed definition to the
//! producer's `POST /startProcess` (SPEC_FULL.md §4.1, §6).

use procrun_core::ProcessDefinition;
use std::time::Duration;
use thiserror::Error;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("producer rejected the request: {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub struct ProducerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProducerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Submit the full definition variant of `POST /startProcess`.
    pub async fn start_process(&self, definition: &ProcessDefinition) -> Result<(), SendError> {
        let response = self
            .http
            .post(format!("{}/startProcess", self.base_url))
            .json(definition)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(SendError::Rejected { status, body })
        }
    }
}
