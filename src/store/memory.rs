//! In-memory [`VectorStore`] implementation for tests.
//!
//! Holds records and their vectors behind `std::sync::RwLock`; similarity
//! ranking is the same brute-force cosine pass as the SQLite store.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::StoreError;

use super::{embed_records, Collection, QueryHit, Record, VectorStore};

struct StoredCollection {
    id: i64,
    name: String,
    model: String,
}

struct StoredRecord {
    collection_id: i64,
    record_id: String,
    record: Record,
    vector: Vec<f32>,
}

#[derive(Default)]
pub struct InMemoryStore {
    next_id: AtomicI64,
    collections: RwLock<Vec<StoredCollection>>,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn get_or_create_collection(
        &self,
        name: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Collection, StoreError> {
        let mut collections = self.collections.write().unwrap();

        if let Some(existing) = collections.iter().find(|c| c.name == name) {
            if existing.model != embedder.model_name() {
                return Err(StoreError::Rejected(format!(
                    "collection '{}' is bound to model '{}', not '{}'",
                    name,
                    existing.model,
                    embedder.model_name()
                )));
            }
            return Ok(Collection {
                id: existing.id,
                name: name.to_string(),
                embedder,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        collections.push(StoredCollection {
            id,
            name: name.to_string(),
            model: embedder.model_name().to_string(),
        });

        Ok(Collection {
            id,
            name: name.to_string(),
            embedder,
        })
    }

    async fn add(&self, collection: &Collection, records: &[Record]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors = embed_records(collection, records).await?;

        let mut stored = self.records.write().unwrap();
        for (record, vector) in records.iter().zip(vectors) {
            stored.push(StoredRecord {
                collection_id: collection.id,
                record_id: record.id.clone(),
                record: record.clone(),
                vector,
            });
        }

        Ok(())
    }

    async fn upsert(&self, collection: &Collection, records: &[Record]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors = embed_records(collection, records).await?;

        let mut stored = self.records.write().unwrap();
        stored.retain(|sr| {
            sr.collection_id != collection.id || !records.iter().any(|r| r.id == sr.record_id)
        });
        for (record, vector) in records.iter().zip(vectors) {
            stored.push(StoredRecord {
                collection_id: collection.id,
                record_id: record.id.clone(),
                record: record.clone(),
                vector,
            });
        }

        Ok(())
    }

    async fn query(
        &self,
        collection: &Collection,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<QueryHit>, StoreError> {
        let query_vec = collection
            .embedder
            .embed(&[query_text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Rejected("empty embedding response".to_string()))?;

        let stored = self.records.read().unwrap();
        let mut hits: Vec<QueryHit> = stored
            .iter()
            .filter(|sr| sr.collection_id == collection.id)
            .map(|sr| QueryHit {
                text: sr.record.text.clone(),
                metadata: sr.record.metadata.clone(),
                score: cosine_similarity(&query_vec, &sr.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    async fn count(&self, collection: &Collection) -> Result<u64, StoreError> {
        let stored = self.records.read().unwrap();
        Ok(stored
            .iter()
            .filter(|sr| sr.collection_id == collection.id)
            .count() as u64)
    }
}
