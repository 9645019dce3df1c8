// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Postgres-backed persistence for the loader/producer/consumer services.
//!
//! Every write path in this crate goes through [`tx::run_atomically`]: one
//! Serializable transaction per file (loader) or per message (consumer),
//! so a crash between steps never leaves the processed-marker and its
//! side effect (a started process, a recorded run) disagreeing.

pub mod definitions;
pub mod error;
pub mod logs;
pub mod messages;
pub mod processed_files;
pub mod runs;
pub mod tx;

pub use error::StorageError;
pub use tx::{run_atomically, Tx, TxError};

pub use definitions::DefinitionsRepo;
pub use logs::LogsRepo;
pub use messages::MessagesRepo;
pub use processed_files::ProcessedFilesRepo;
pub use runs::RunsRepo;

/// Run all embedded migrations against `pool`. Called once at service
/// startup by each of the loader, producer, and consumer binaries.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
