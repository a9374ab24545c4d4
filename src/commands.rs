
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{Document, VectorCache};
use crate::config::Config;
use crate::retrieval::{RetrievalService, StartPath};

const CONTEXT_HEADER: &str =
    "Here is some relevant documentation to help answer the question:\n\n";
const MAX_CONTEXT_CHARS: usize = 100_000;

fn create_service() -> Result<RetrievalService> {
    let config = Config::load_default().context("Failed to load configuration")?;
    RetrievalService::new(&config).context("Failed to create retrieval service")
}

/// Load the documentation corpus, building the snapshot if needed
#[inline]
pub async fn init_documents() -> Result<()> {
    let service = create_service()?;

    println!("Initializing documentation index...");
    let path = service
        .initialize_with_path()
        .await
        .context("Initialization failed")?;

    let stats = service.stats();
    match path {
        StartPath::Snapshot => println!(
            "✓ Loaded {} documents from {}",
            stats.documents,
            service.cache().snapshot_path().display()
        ),
        StartPath::Archive => println!(
            "✓ Indexed {} documents from the source archive",
            stats.documents
        ),
    }
    println!("  {}", stats);

    Ok(())
}

/// Print the best matches for `text`, or the assembled context block
#[inline]
pub async fn query_documents(text: &str, context: bool) -> Result<()> {
    let service = create_service()?;
    service
        .initialize()
        .await
        .context("Initialization failed")?;

    let results = service
        .find_relevant_documents_scored(text)
        .await
        .context("Query failed")?;
    info!("Query returned {} documents; {}", results.len(), service.stats());

    if results.is_empty() {
        println!("No documents matched.");
        return Ok(());
    }

    if context {
        let documents: Vec<Arc<Document>> = results.into_iter().map(|r| r.document).collect();
        print!("{}", build_context_message(&documents));
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} (score {:.4})",
            rank + 1,
            result.document.path,
            result.score
        );
    }

    Ok(())
}

/// Show what the snapshot on disk holds.
///
/// Reads the snapshot alone, so it works without network access or an API key.
#[inline]
pub fn show_status() -> Result<()> {
    let config = Config::load_default().unwrap_or_default();
    let cache = VectorCache::new(config.snapshot_path());

    println!("📊 Docs RAG Status");
    println!("{}", "=".repeat(50));
    println!(
        "Repository: {}/{} ({})",
        config.repository.owner, config.repository.repo, config.repository.branch
    );
    println!("Embedding model: {}", config.embedding.model);
    println!("Snapshot: {}", cache.snapshot_path().display());

    match cache.load_from_disk() {
        Ok(0) => println!("   No documents cached. Run 'docs-rag init' to build the index."),
        Ok(count) => {
            println!("   Documents: {}", count);
            let dimension = cache
                .list()
                .iter()
                .find(|doc| doc.has_embedding())
                .map(|doc| doc.embedding.len());
            match dimension {
                Some(dimension) => println!("   Embedding dimension: {}", dimension),
                None => println!("   ⚠️  No embeddings stored"),
            }
        }
        Err(e) => println!("   ❌ Snapshot unreadable: {}", e),
    }

    Ok(())
}

/// Delete the embeddings snapshot so the next initialization rebuilds it
#[inline]
pub fn reset_cache() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let cache = VectorCache::new(config.snapshot_path());

    if cache.remove_snapshot()? {
        println!("✓ Removed {}", cache.snapshot_path().display());
    } else {
        println!("No snapshot at {}", cache.snapshot_path().display());
    }

    Ok(())
}

/// Format retrieved documents as a context block for a chat model.
///
/// Documents are added in order; any document that would push the message
/// past the size limit is left out.
#[inline]
pub fn build_context_message(documents: &[Arc<Document>]) -> String {
    let mut message = String::from(CONTEXT_HEADER);
    let mut length = CONTEXT_HEADER.chars().count();

    for document in documents {
        let entry = format!("From {}:\n{}\n\n", document.path, document.content);
        let entry_length = entry.chars().count();
        if length + entry_length > MAX_CONTEXT_CHARS {
            debug!(
                "Skipping {} ({} chars) to stay within the context limit",
                document.path, entry_length
            );
            continue;
        }
        message.push_str(&entry);
        length += entry_length;
    }

    message
}
