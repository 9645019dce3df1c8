// SPDX-License-Identifier: MIT

//! Tracks which files the loader has already handed off, keyed by filename.
//!
//! The loader's whole per-file pipeline — existence check, claim, parse,
//! validate, publish, completion — runs inside one transaction
//! ([`crate::tx::run_atomically`]), so [`ProcessedFilesRepo::claim`] and
//! [`ProcessedFilesRepo::mark_completed`] only ever commit together.

use crate::tx::Tx;
use crate::StorageError;

pub struct ProcessedFilesRepo;

impl ProcessedFilesRepo {
    pub async fn exists(tx: &mut Tx, filename: &str) -> Result<bool, StorageError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM processed_files WHERE filename = $1")
                .bind(filename)
                .fetch_optional(tx.conn())
                .await?;
        Ok(row.is_some())
    }

    /// Claim `filename` before the file's contents are even read, so a crash
    /// mid-parse leaves a claimed-but-not-completed row rather than no row
    /// at all — the claim and the eventual `mark_completed` share this same
    /// transaction, so either both land or neither does.
    pub async fn claim(tx: &mut Tx, filename: &str) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO processed_files (filename, completed_at) VALUES ($1, NULL)
             ON CONFLICT (filename) DO NOTHING",
        )
        .bind(filename)
        .execute(tx.conn())
        .await?;
        Ok(())
    }

    pub async fn mark_completed(tx: &mut Tx, filename: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE processed_files SET completed_at = now() WHERE filename = $1")
            .bind(filename)
            .execute(tx.conn())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // This module only wraps SQL; there is no fake-Tx seam to unit test it
    // against, so it needs a live Postgres instance to verify. The loader's
    // call sequencing (claim before parse, complete after publish) is what
    // the `procrun_loader::scan` unit tests exercise without a database.
}
