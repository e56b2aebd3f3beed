//! Ingestion pipeline orchestration.
//!
//! Coordinates the full run: discovery → read → chunk → identifier
//! assignment → batch embed+store, strictly one file at a time. Errors are
//! captured at the file boundary: a file that cannot be decoded, or whose
//! batch add fails, is logged and skipped while the run continues.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use globset::Glob;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::chunk::chunk;
use crate::config::{Config, FilesConfig, IdStrategy};
use crate::error::DecodeError;
use crate::store::{Collection, Record, RecordMetadata, VectorStore};

/// Aggregate counters for one ingestion run.
///
/// `total_chunks` is counted before each add call, so chunks from a failed
/// batch still appear in the total even though they are absent from the
/// store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total_files: usize,
    pub total_chunks: usize,
}

/// Run full ingestion over the configured corpus into `collection`.
///
/// File sequence numbers are 1-based positions in (sorted) discovery
/// order; with the `sequential` identifier strategy they feed directly
/// into record identifiers, so re-running against the same corpus appends
/// duplicate records. The `stable` strategy hashes (path, chunk index) and
/// writes through upsert instead, making re-runs idempotent.
pub async fn run_process(
    config: &Config,
    store: &dyn VectorStore,
    collection: &Collection,
) -> Result<RunSummary> {
    let files = discover_files(&config.files)?;
    log::info!(
        "found {} files matching '{}' under {}",
        files.len(),
        config.files.glob,
        config.files.root.display()
    );

    let mut summary = RunSummary::default();

    for (idx, path) in files.iter().enumerate() {
        let file_seq = idx + 1;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        log::info!("processing file {}/{}: {}", file_seq, files.len(), file_name);

        let text = match read_document(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("skipping {}: {:#}", path.display(), e);
                continue;
            }
        };
        summary.total_files += 1;

        let chunks = chunk(&text, config.chunking.max_size);
        if chunks.is_empty() {
            log::warn!("skipping empty file: {}", path.display());
            continue;
        }
        summary.total_chunks += chunks.len();

        let records = build_records(
            file_seq,
            path,
            &file_name,
            &chunks,
            config.ingest.id_strategy,
        );

        let result = match config.ingest.id_strategy {
            IdStrategy::Sequential => store.add(collection, &records).await,
            IdStrategy::Stable => store.upsert(collection, &records).await,
        };

        match result {
            Ok(()) => log::info!("added {} chunks from {}", records.len(), file_name),
            Err(e) => log::warn!("failed to add chunks from {}: {}", file_name, e),
        }
    }

    Ok(summary)
}

/// Enumerate files under the configured root matching the glob, sorted for
/// deterministic ordering.
fn discover_files(config: &FilesConfig) -> Result<Vec<PathBuf>> {
    if !config.root.exists() {
        bail!("files root does not exist: {}", config.root.display());
    }

    let matcher = Glob::new(&config.glob)?.compile_matcher();
    let mut paths = Vec::new();

    for entry in WalkDir::new(&config.root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&config.root)
            .unwrap_or(entry.path());
        if matcher.is_match(relative) {
            paths.push(entry.path().to_path_buf());
        }
    }

    paths.sort();
    Ok(paths)
}

/// Read a file with a fallback encoding sequence: UTF-8 first, then GBK.
fn read_document(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            let (text, _, had_errors) = encoding_rs::GBK.decode(err.as_bytes());
            if had_errors {
                Err(DecodeError {
                    path: path.to_path_buf(),
                }
                .into())
            } else {
                Ok(text.into_owned())
            }
        }
    }
}

fn build_records(
    file_seq: usize,
    path: &Path,
    file_name: &str,
    chunks: &[String],
    strategy: IdStrategy,
) -> Vec<Record> {
    let total_chunks = chunks.len() as i64;
    chunks
        .iter()
        .enumerate()
        .map(|(chunk_idx, text)| Record {
            id: record_id(strategy, file_seq, path, chunk_idx),
            text: text.clone(),
            metadata: RecordMetadata {
                source: file_name.to_string(),
                full_path: path.display().to_string(),
                chunk: chunk_idx as i64,
                total_chunks,
            },
        })
        .collect()
}

fn record_id(strategy: IdStrategy, file_seq: usize, path: &Path, chunk_idx: usize) -> String {
    match strategy {
        IdStrategy::Sequential => format!("doc_{}_{}", file_seq, chunk_idx),
        IdStrategy::Stable => {
            let mut hasher = Sha256::new();
            hasher.update(path.display().to_string().as_bytes());
            hasher.update(b":");
            hasher.update((chunk_idx as u64).to_le_bytes());
            format!("{:x}", hasher.finalize())
        }
    }
}
