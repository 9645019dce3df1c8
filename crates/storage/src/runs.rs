// SPDX-License-Identifier: MIT

//! Process run records: one row per started process, carrying a frozen
//! copy of the [`procrun_core::ProcessDefinition`] it was started from.

use crate::tx::Tx;
use crate::StorageError;
use chrono::{DateTime, Utc};
use procrun_core::{ProcessDefinition, ProcessRun, RunStatus};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

pub struct RunsRepo;

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    definition: serde_json::Value,
    status: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl RunRow {
    fn into_run(self) -> Result<ProcessRun, StorageError> {
        let definition: ProcessDefinition = serde_json::from_value(self.definition)?;
        let status = RunStatus::from_str(&self.status)
            .map_err(|e| StorageError::NotFound(format!("unreadable status {e}")))?;
        Ok(ProcessRun {
            id: self.id,
            definition,
            status,
            started_at: self.started_at,
            ended_at: self.ended_at,
        })
    }
}

impl RunsRepo {
    pub async fn insert(tx: &mut Tx, run: &ProcessRun) -> Result<(), StorageError> {
        let definition = serde_json::to_value(&run.definition)?;
        sqlx::query(
            "INSERT INTO process_runs (id, definition, status, started_at, ended_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(run.id)
        .bind(&definition)
        .bind(run.status.as_str())
        .bind(run.started_at)
        .bind(run.ended_at)
        .execute(tx.conn())
        .await?;
        Ok(())
    }

    /// Transition `id` to `status` within the run's own owning transaction,
    /// stamping `ended_at` when the new status is terminal. Called only by
    /// the driver that is executing this run, so no compare-and-swap is
    /// needed — single-writer discipline, not row locking, is what keeps
    /// this monotonic.
    pub async fn update_status(
        tx: &mut Tx,
        id: Uuid,
        status: RunStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE process_runs SET status = $1, ended_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(ended_at)
            .bind(id)
            .execute(tx.conn())
            .await?;
        Ok(())
    }

    /// Force `id` to `stopped` outside of any run transaction. This is the
    /// one status transition allowed from any state (including terminal
    /// ones) and is a standalone bookkeeping write, not part of the run's
    /// atomic execution — it does not reach into the executor and cannot
    /// roll back work already done. Returns whether a row existed to stop.
    pub async fn mark_stopped(pool: &PgPool, id: Uuid, stopped_at: DateTime<Utc>) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE process_runs SET status = $1, ended_at = $2 WHERE id = $3",
        )
        .bind(RunStatus::Stopped.as_str())
        .bind(stopped_at)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<ProcessRun, StorageError> {
        let row: Option<RunRow> = sqlx::query_as(
            r#"SELECT id, definition, status, started_at, ended_at
               FROM process_runs WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        let row = row.ok_or_else(|| StorageError::NotFound(format!("process run {id}")))?;
        row.into_run()
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ProcessRun>, StorageError> {
        let rows: Vec<RunRow> = sqlx::query_as(
            r#"SELECT id, definition, status, started_at, ended_at
               FROM process_runs ORDER BY started_at DESC"#,
        )
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(RunRow::into_run).collect()
    }
}

#[cfg(test)]
mod tests {
    // SQL-only module; needs a live Postgres instance to verify.
}
