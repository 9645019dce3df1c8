// SPDX-License-Identifier: MIT

//! Bus consumer loop (SPEC_FULL.md §4.5): for each delivered message, the
//! whole block — existence check, claim, process-run execution, and
//! completion marker — runs inside one Serializable transaction. The
//! transaction commits only if all four steps succeed; a failed or
//! stopped run rolls the entire block back (including the `process_runs`
//! row and its logs) and the message is nacked for redelivery. Task
//! execution performs outbound side effects (spawning processes, SSH)
//! that are not reversible — the design accepts at-least-once semantics
//! for those, relying on the message idempotency key to prevent
//! double-recording once a run does commit.

use procrun_bus::MessageBus;
use procrun_core::{Clock, RunStatus};
use procrun_engine::RunDriver;
use procrun_storage::{run_atomically, MessagesRepo};
use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn consume_loop<C: Clock>(
    pool: PgPool,
    bus: Arc<MessageBus>,
    driver: Arc<RunDriver<C>>,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut consumer = bus.consumer("procrun-consumer").await?;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            delivery = consumer.next() => {
                let Some(delivery) = delivery? else {
                    return Err("bus consumer stream closed".into());
                };

                let message = delivery.message.clone();
                let uuid = message.uuid;
                // Derived from the supervisor's own root token, so service
                // shutdown (SIGINT/SIGTERM) actually reaches the executor
                // running inside this transaction; `/stopProcess/:id` does
                // not touch this token at all (SPEC_FULL.md §4.5, §9).
                let run_cancel = cancel.child_token();

                let outcome = run_atomically(&pool, |tx| {
                    let driver = Arc::clone(&driver);
                    let definition = message.definition.clone();
                    let run_cancel = run_cancel.clone();
                    async move {
                        if MessagesRepo::exists(tx, uuid).await? {
                            return Ok(None);
                        }
                        MessagesRepo::add(tx, uuid, &definition).await?;

                        let status = driver
                            .execute(tx, uuid, &definition, run_cancel)
                            .await
                            .map_err(|e| e.to_string())?;

                        if status != RunStatus::Completed {
                            return Err(format!("process run {uuid} ended as {status}"));
                        }

                        MessagesRepo::mark_completed(tx, uuid).await?;
                        Ok(Some(status))
                    }
                })
                .await;

                match outcome {
                    Ok(Some(status)) => {
                        info!(run_id = %uuid, %status, "process run committed");
                        delivery.ack().await?;
                    }
                    Ok(None) => {
                        info!(uuid = %uuid, "message already processed, acking without re-running");
                        delivery.ack().await?;
                    }
                    Err(err) => {
                        warn!(run_id = %uuid, error = %err, "run did not complete, nacking for redelivery");
                        delivery.nack_requeue().await?;
                    }
                }
            }
        }
    }
}
