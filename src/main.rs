//! # Markdown Embedder CLI (`mde`)
//!
//! Commands for ingesting a Markdown corpus into a persistent vector index
//! and querying it by similarity.
//!
//! ```bash
//! mde --config ./config/mde.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mde process` | Chunk, embed, and store every matching file; print summary counts |
//! | `mde query "<text>"` | Print the nearest chunks with source, path, position, and preview |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use markdown_embedder::embedding::{Embedder, OllamaEmbedder};
use markdown_embedder::store::sqlite::SqliteStore;
use markdown_embedder::store::VectorStore;
use markdown_embedder::{config, ingest, search};

/// Markdown Embedder — ingest a Markdown corpus into a persistent vector
/// index and search it by similarity.
#[derive(Parser)]
#[command(
    name = "mde",
    about = "Markdown corpus ingestion and semantic retrieval over a persistent vector index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mde.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the configured corpus: discover files, chunk, embed, and
    /// store. Prints total document and chunk counts when done.
    Process,

    /// Query the collection with a search string and print up to `top_k`
    /// results.
    Query {
        /// The free-text query.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let store = SqliteStore::open(&cfg.store.path).await?;
    let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(&cfg.embedding)?);
    let collection = store
        .get_or_create_collection(&cfg.store.collection, embedder)
        .await?;

    match cli.command {
        Commands::Process => {
            let summary = ingest::run_process(&cfg, &store, &collection).await?;
            println!(
                "Completed processing. Total documents: {}, Total chunks: {}",
                summary.total_files, summary.total_chunks
            );
        }
        Commands::Query { query, top_k } => {
            log::info!("querying collection with: '{}'", query);
            let hits = search::search(&store, &collection, &query, top_k).await?;

            if hits.is_empty() {
                println!("No results.");
            } else {
                println!("\nSearch Results:");
                for (i, hit) in hits.iter().enumerate() {
                    println!("\nResult {}:", i + 1);
                    println!("Source: {}", hit.source);
                    println!("Path: {}", hit.full_path);
                    println!("Chunk: {}/{}", hit.chunk, hit.total_chunks);
                    println!("Content: {}...", hit.content_preview);
                }
            }
        }
    }

    store.close().await;
    Ok(())
}
