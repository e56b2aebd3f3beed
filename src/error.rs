//! Error taxonomy for the ingestion and query pipelines.
//!
//! Per-file errors (`DecodeError`, `ProviderError`, `StoreError` during a
//! batch add) are caught and logged at the file boundary and never abort a
//! run. Configuration and collection-creation failures surface as `anyhow`
//! errors at the CLI boundary and abort immediately.

use std::path::PathBuf;

use thiserror::Error;

/// The embedding provider rejected or failed a call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-success HTTP status; carries the raw response body.
    #[error("embedding endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport-level failure (connection refused, timeout, bad TLS).
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Success status but no usable `embedding` field in the body.
    #[error("embedding response missing `embedding` field")]
    MalformedResponse,
}

/// The vector store rejected an operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Embedding the batch (or the query text) failed; the whole call is
    /// abandoned.
    #[error(transparent)]
    Embedding(#[from] ProviderError),

    #[error("malformed record metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("record batch rejected: {0}")]
    Rejected(String),
}

/// A file decoded under none of the attempted encodings.
#[derive(Debug, Error)]
#[error("could not decode {} as UTF-8 or GBK", .path.display())]
pub struct DecodeError {
    pub path: PathBuf,
}
