//! Query-side projection over the vector store.
//!
//! Embeds a free-text query through the collection's bound embedding
//! function (inside the store) and formats the top-K nearest chunks for
//! display. No ranking happens here beyond what the store returns.

use crate::error::StoreError;
use crate::store::{Collection, VectorStore};

/// Number of characters shown from each matching chunk.
const PREVIEW_CHARS: usize = 150;

/// A formatted search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Source file name.
    pub source: String,
    /// Full path of the source file.
    pub full_path: String,
    /// 1-based chunk position within its document, for display.
    pub chunk: i64,
    pub total_chunks: i64,
    /// First 150 characters of the chunk text.
    pub content_preview: String,
    pub score: f32,
}

/// Retrieve up to `top_k` chunks nearest to `query`, formatted for display.
/// Blank queries yield no results without touching the store.
pub async fn search(
    store: &dyn VectorStore,
    collection: &Collection,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchHit>, StoreError> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let hits = store.query(collection, query, top_k).await?;

    Ok(hits
        .into_iter()
        .map(|hit| SearchHit {
            source: hit.metadata.source,
            full_path: hit.metadata.full_path,
            chunk: hit.metadata.chunk + 1,
            total_chunks: hit.metadata.total_chunks,
            content_preview: hit.text.chars().take(PREVIEW_CHARS).collect(),
            score: hit.score,
        })
        .collect())
}
