// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for procrun_core::ErrorKind {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => procrun_core::ErrorKind::NotFound(what),
            other => procrun_core::ErrorKind::Persistence(other.to_string()),
        }
    }
}
