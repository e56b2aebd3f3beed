//! SQLite-backed persistent vector store.
//!
//! Collections and records live in a single database file under the
//! configured persistence directory. Embedding vectors are stored as
//! little-endian f32 BLOBs; similarity queries are brute-force cosine over
//! the collection's records.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use crate::error::StoreError;

use super::{embed_records, Collection, QueryHit, Record, RecordMetadata, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store under `dir`. The directory and the
    /// database file are created if missing, and the schema is applied.
    pub async fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join("index.sqlite");

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                model TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        // record_id is deliberately not unique: append-mode ingestion keeps
        // duplicate identifiers as separate rows.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection_id INTEGER NOT NULL REFERENCES collections(id),
                record_id TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_collection
             ON records(collection_id, record_id)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn get_or_create_collection(
        &self,
        name: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Collection, StoreError> {
        let existing = sqlx::query("SELECT id, model FROM collections WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = existing {
            let model: String = row.get("model");
            if model != embedder.model_name() {
                return Err(StoreError::Rejected(format!(
                    "collection '{}' is bound to model '{}', not '{}'",
                    name,
                    model,
                    embedder.model_name()
                )));
            }
            log::info!("using existing collection: {}", name);
            return Ok(Collection {
                id: row.get("id"),
                name: name.to_string(),
                embedder,
            });
        }

        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "INSERT INTO collections (name, model, created_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(embedder.model_name())
        .bind(now)
        .execute(&self.pool)
        .await?;

        log::info!("created new collection: {}", name);
        Ok(Collection {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            embedder,
        })
    }

    async fn add(&self, collection: &Collection, records: &[Record]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors = embed_records(collection, records).await?;

        let mut tx = self.pool.begin().await?;
        for (record, vector) in records.iter().zip(&vectors) {
            sqlx::query(
                "INSERT INTO records (collection_id, record_id, text, metadata, embedding)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(collection.id)
            .bind(&record.id)
            .bind(&record.text)
            .bind(serde_json::to_string(&record.metadata)?)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn upsert(&self, collection: &Collection, records: &[Record]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors = embed_records(collection, records).await?;

        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query("DELETE FROM records WHERE collection_id = ? AND record_id = ?")
                .bind(collection.id)
                .bind(&record.id)
                .execute(&mut *tx)
                .await?;
        }
        for (record, vector) in records.iter().zip(&vectors) {
            sqlx::query(
                "INSERT INTO records (collection_id, record_id, text, metadata, embedding)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(collection.id)
            .bind(&record.id)
            .bind(&record.text)
            .bind(serde_json::to_string(&record.metadata)?)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

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

        let rows = sqlx::query("SELECT text, metadata, embedding FROM records WHERE collection_id = ?")
            .bind(collection.id)
            .fetch_all(&self.pool)
            .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata");
            let metadata: RecordMetadata = serde_json::from_str(&metadata_json)?;
            hits.push(QueryHit {
                text: row.get("text"),
                metadata,
                score: cosine_similarity(&query_vec, &blob_to_vec(&blob)),
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    async fn count(&self, collection: &Collection) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection_id = ?")
            .bind(collection.id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
