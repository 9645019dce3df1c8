// SPDX-License-Identifier: MIT

//! Idempotency ledger for bus messages, keyed on [`procrun_core::Message::uuid`].
//!
//! Mirrors [`crate::processed_files::ProcessedFilesRepo`] on the consumer
//! side: the consumer checks [`MessagesRepo::exists`], [`MessagesRepo::add`]s
//! the claim row (carrying the message's definition, so it survives even if
//! the run itself never starts), runs the process, then calls
//! [`MessagesRepo::mark_completed`] — all inside the one transaction that
//! also owns the run's own bookkeeping, so re-delivery of a message already
//! committed is a no-op rather than a duplicate run.

use crate::tx::Tx;
use crate::StorageError;
use procrun_core::ProcessDefinition;
use uuid::Uuid;

pub struct MessagesRepo;

impl MessagesRepo {
    pub async fn exists(tx: &mut Tx, uuid: Uuid) -> Result<bool, StorageError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM consumed_messages WHERE uuid = $1")
                .bind(uuid)
                .fetch_optional(tx.conn())
                .await?;
        Ok(row.is_some())
    }

    pub async fn add(
        tx: &mut Tx,
        uuid: Uuid,
        definition: &ProcessDefinition,
    ) -> Result<(), StorageError> {
        let definition = serde_json::to_value(definition)?;
        sqlx::query(
            "INSERT INTO consumed_messages (uuid, definition, completed_at)
             VALUES ($1, $2, NULL)
             ON CONFLICT (uuid) DO NOTHING",
        )
        .bind(uuid)
        .bind(&definition)
        .execute(tx.conn())
        .await?;
        Ok(())
    }

    pub async fn mark_completed(tx: &mut Tx, uuid: Uuid) -> Result<(), StorageError> {
        sqlx::query("UPDATE consumed_messages SET completed_at = now() WHERE uuid = $1")
            .bind(uuid)
            .execute(tx.conn())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // SQL-only module; needs a live Postgres instance to verify. The
    // claim-then-execute-then-complete ordering it backs is exercised by
    // `procrun_engine`'s driver tests against an in-memory observer.
}
