//! Vector store abstraction.
//!
//! The [`VectorStore`] trait models the persistent similarity-search index
//! as a black box: named collections, batch writes, and top-K queries. A
//! [`Collection`] is bound to one embedding function for its whole
//! lifetime; the store embeds record text at write time and query text at
//! query time through that binding.
//!
//! Two implementations ship with the crate:
//! - [`sqlite::SqliteStore`] — durable storage, vectors as BLOBs,
//!   brute-force cosine ranking.
//! - [`memory::InMemoryStore`] — same semantics without disk access, for
//!   tests.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedder;
use crate::error::StoreError;

/// A record queued for storage: identifier, chunk text, and metadata.
/// The embedding vector is attached inside the store's write path.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub metadata: RecordMetadata,
}

/// Provenance metadata persisted alongside each record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source: String,
    pub full_path: String,
    pub chunk: i64,
    pub total_chunks: i64,
}

/// One query result: chunk text, its metadata, and the similarity score
/// (cosine, most-similar first).
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub text: String,
    pub metadata: RecordMetadata,
    pub score: f32,
}

/// Handle to a named collection, bound to one embedding function.
pub struct Collection {
    id: i64,
    name: String,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("model", &self.embedder.model_name())
            .finish()
    }
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The embedding model this collection is bound to.
    pub fn model(&self) -> &str {
        self.embedder.model_name()
    }
}

/// Abstract persistent similarity-search store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return the collection named `name`, creating it if absent. Reopening
    /// an existing collection under a different embedding model is an
    /// error: the binding must stay consistent across runs.
    async fn get_or_create_collection(
        &self,
        name: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Collection, StoreError>;

    /// Embed and append a batch of records. Any rejected record aborts the
    /// whole batch. Duplicate identifiers are stored as separate rows
    /// (append-only log semantics).
    async fn add(&self, collection: &Collection, records: &[Record]) -> Result<(), StoreError>;

    /// Embed and insert a batch, first removing any existing records with
    /// the same identifiers. Any rejected record aborts the whole batch.
    async fn upsert(&self, collection: &Collection, records: &[Record]) -> Result<(), StoreError>;

    /// Embed `query_text` with the collection's bound embedder and return
    /// the `top_k` most similar records, best first. An empty collection
    /// yields an empty result, not an error. Tie order is unspecified.
    async fn query(
        &self,
        collection: &Collection,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<QueryHit>, StoreError>;

    /// Number of records currently stored in the collection.
    async fn count(&self, collection: &Collection) -> Result<u64, StoreError>;
}

/// Embed the text of every record in the batch, enforcing the
/// one-vector-per-record contract.
async fn embed_records(
    collection: &Collection,
    records: &[Record],
) -> Result<Vec<Vec<f32>>, StoreError> {
    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let vectors = collection.embedder.embed(&texts).await?;
    if vectors.len() != records.len() {
        return Err(StoreError::Rejected(format!(
            "provider returned {} vectors for {} records",
            vectors.len(),
            records.len()
        )));
    }
    Ok(vectors)
}
