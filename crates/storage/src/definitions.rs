// SPDX-License-Identifier: MIT

//! Named process-definition templates, used by the producer's variant-B
//! `POST /startProcess` path: a caller supplies `{name, parameters}` and
//! the producer fills in a stored template rather than a full definition
//! (SPEC_FULL.md §4.3).

use crate::tx::Tx;
use crate::StorageError;
use procrun_core::ProcessDefinition;
use sqlx::PgPool;

pub struct DefinitionsRepo;

impl DefinitionsRepo {
    pub async fn upsert(tx: &mut Tx, definition: &ProcessDefinition) -> Result<(), StorageError> {
        let body = serde_json::to_value(definition)?;
        sqlx::query(
            "INSERT INTO process_definitions (name, definition, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (name) DO UPDATE SET definition = EXCLUDED.definition, updated_at = now()",
        )
        .bind(&definition.name)
        .bind(&body)
        .execute(tx.conn())
        .await?;
        Ok(())
    }

    pub async fn get(pool: &PgPool, name: &str) -> Result<ProcessDefinition, StorageError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT definition FROM process_definitions WHERE name = $1")
                .bind(name)
                .fetch_optional(pool)
                .await?;
        let (body,) = row.ok_or_else(|| StorageError::NotFound(format!("process definition {name}")))?;
        Ok(serde_json::from_value(body)?)
    }
}

#[cfg(test)]
mod tests {
    // Exercised by the integration suite against a live Postgres instance.
}
