// SPDX-License-Identifier: MIT

//! One pass over the watch directory: find `.yaml`/`.yml` files not yet
//! processed, and for each one run the whole claim/parse/validate/publish/
//! complete pipeline inside a single Serializable transaction
//! (SPEC_FULL.md §4.1, §4.3).

use procrun_adapters::ProducerClient;
use procrun_core::{parse_definition_yaml, validate};
use procrun_storage::{run_atomically, ProcessedFilesRepo};
use sqlx::PgPool;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} has no file name")]
    NoFileName { path: String },
}

/// Scan `watch_dir` non-recursively and process every unseen `.yaml`/`.yml`
/// file found. Errors on individual files are logged and skipped; they do
/// not abort the rest of the scan, so a malformed file is retried on the
/// next tick (and will keep failing until it is fixed or removed —
/// SPEC_FULL.md does not define a poison-file quarantine).
pub async fn scan_once(
    pool: &PgPool,
    producer: &ProducerClient,
    watch_dir: &Path,
) -> Result<(), ScanError> {
    let mut entries = tokio::fs::read_dir(watch_dir)
        .await
        .map_err(|e| ScanError::Io {
            path: watch_dir.display().to_string(),
            source: e,
        })?;

    while let Some(entry) = entries.next_entry().await.map_err(|e| ScanError::Io {
        path: watch_dir.display().to_string(),
        source: e,
    })? {
        let path = entry.path();
        if !is_yaml_file(&path) {
            continue;
        }
        if let Err(err) = process_file(pool, producer, &path).await {
            warn!(path = %path.display(), error = %err, "failed to process file, will retry next tick");
        }
    }

    Ok(())
}

fn is_yaml_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Claim, parse, validate, publish, and mark complete — all inside one
/// transaction, keyed on the file's basename rather than its full path so
/// the same filename dropped under a different watch directory is still
/// recognized as already handled.
async fn process_file(
    pool: &PgPool,
    producer: &ProducerClient,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filename = path
        .file_name()
        .ok_or_else(|| ScanError::NoFileName {
            path: path.display().to_string(),
        })?
        .to_string_lossy()
        .to_string();

    run_atomically(pool, |tx| {
        let filename = filename.clone();
        let path = path.to_path_buf();
        async move {
            if ProcessedFilesRepo::exists(tx, &filename).await? {
                return Ok::<_, Box<dyn std::error::Error + Send + Sync>>(());
            }
            ProcessedFilesRepo::claim(tx, &filename).await?;

            let contents = tokio::fs::read_to_string(&path).await?;
            let mut definition = parse_definition_yaml(&contents)?;
            validate(&mut definition)?;

            producer.start_process(&definition).await?;

            ProcessedFilesRepo::mark_completed(tx, &filename).await?;
            info!(filename = %filename, "handed definition off to producer");
            Ok(())
        }
    })
    .await
    .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;

    Ok(())
}
