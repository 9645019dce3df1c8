// SPDX-License-Identifier: MIT

//! Append-only log lines attached to a process run, surfaced by the
//! consumer's `/processlog/:id` endpoint (SPEC_FULL.md §6).

use crate::tx::Tx;
use crate::StorageError;
use procrun_core::ProcessLog;
use sqlx::PgPool;
use uuid::Uuid;

pub struct LogsRepo;

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    process_id: Uuid,
    log: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<LogRow> for ProcessLog {
    fn from(row: LogRow) -> Self {
        ProcessLog {
            id: row.id,
            process_id: row.process_id,
            log: row.log,
            created_at: row.created_at,
        }
    }
}

impl LogsRepo {
    /// Append a log line inside the run's owning transaction. Logs are
    /// written alongside the run's own status updates now, not on a
    /// separate connection — a rolled-back run rolls its log lines back
    /// with it, which is the point: a failed run with no committed run row
    /// should not leave orphaned log lines referencing it either.
    pub async fn append_tx(tx: &mut Tx, process_id: Uuid, line: &str) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO process_logs (process_id, log, created_at) VALUES ($1, $2, now())",
        )
        .bind(process_id)
        .bind(line)
        .execute(tx.conn())
        .await?;
        Ok(())
    }

    pub async fn for_run(pool: &PgPool, process_id: Uuid) -> Result<Vec<ProcessLog>, StorageError> {
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT id, process_id, log, created_at FROM process_logs
             WHERE process_id = $1 ORDER BY id ASC",
        )
        .bind(process_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(ProcessLog::from).collect())
    }
}

#[cfg(test)]
mod tests {
    // SQL-only module; needs a live Postgres instance to verify.
}
