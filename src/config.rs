use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub files: FilesConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding the persistent index. Created on startup.
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    /// Root directory to walk for source documents.
    pub root: PathBuf,
    /// Glob matched against paths relative to `root`.
    #[serde(default = "default_glob")]
    pub glob: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

/// How record identifiers are derived during ingestion.
///
/// `Sequential` reproduces append-only log semantics: identifiers come from
/// the per-run file sequence number, so re-running against the same corpus
/// duplicates every record. `Stable` hashes (path, chunk index) and writes
/// through upsert, making re-ingestion idempotent.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Sequential,
    Stable,
}

fn default_collection() -> String {
    "markdown_documents".to_string()
}
fn default_glob() -> String {
    "**/*.md".to_string()
}
fn default_max_size() -> usize {
    512
}
fn default_url() -> String {
    "http://localhost:11434/api/embeddings".to_string()
}
fn default_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_size == 0 {
        anyhow::bail!("chunking.max_size must be > 0");
    }

    if config.store.collection.trim().is_empty() {
        anyhow::bail!("store.collection must not be empty");
    }

    if config.embedding.url.trim().is_empty() {
        anyhow::bail!("embedding.url must not be empty");
    }

    globset::Glob::new(&config.files.glob)
        .with_context(|| format!("Invalid files.glob pattern: '{}'", config.files.glob))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Config> {
        let cfg: Config = toml::from_str(toml)?;
        if cfg.chunking.max_size == 0 {
            anyhow::bail!("chunking.max_size must be > 0");
        }
        Ok(cfg)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse(
            r#"
            [store]
            path = "./data"

            [files]
            root = "./docs"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.store.collection, "markdown_documents");
        assert_eq!(cfg.files.glob, "**/*.md");
        assert_eq!(cfg.chunking.max_size, 512);
        assert_eq!(cfg.embedding.model, "nomic-embed-text");
        assert_eq!(
            cfg.embedding.url,
            "http://localhost:11434/api/embeddings"
        );
        assert_eq!(cfg.ingest.id_strategy, IdStrategy::Sequential);
    }

    #[test]
    fn missing_required_store_path_fails() {
        let result = parse(
            r#"
            [files]
            root = "./docs"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_required_files_root_fails() {
        let result = parse(
            r#"
            [store]
            path = "./data"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn zero_max_size_rejected() {
        let result = parse(
            r#"
            [store]
            path = "./data"

            [files]
            root = "./docs"

            [chunking]
            max_size = 0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn stable_id_strategy_parses() {
        let cfg = parse(
            r#"
            [store]
            path = "./data"

            [files]
            root = "./docs"

            [ingest]
            id_strategy = "stable"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ingest.id_strategy, IdStrategy::Stable);
    }
}
