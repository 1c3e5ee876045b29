//! Document ingestion commands: add, delete, clear, list.

use anyhow::{bail, Context, Result};
use clap::Args;
use ragvault_store::{DocumentChunk, MatchMode, StoreError, VectorStoreService};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Embed and store chunks from a JSON Lines file
#[derive(Args, Debug)]
pub struct AddCommand {
    /// File with one chunk object per line:
    /// {"content": ..., "chunk_id": ..., "source": ..., "page": ...}
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AddCommand {
    pub async fn execute(&self, store: &VectorStoreService) -> Result<()> {
        tracing::info!("Executing add command for {:?}", self.file);

        let chunks = read_chunks(&self.file)?;
        let skipped = chunks.iter().filter(|c| c.is_empty()).count();
        let chunks: Vec<DocumentChunk> = chunks.into_iter().filter(|c| !c.is_empty()).collect();
        if skipped > 0 {
            tracing::warn!("Skipping {} chunks with blank content", skipped);
        }

        let added = store.try_add_documents(&chunks).await?;
        let total = store.get_document_count().await;

        if self.json {
            let output = serde_json::json!({
                "added": added,
                "skipped": skipped,
                "total": total,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Added {} chunks ({} total)", added, total);
        }

        Ok(())
    }
}

/// Parse a JSON Lines chunk file, skipping blank lines.
pub fn read_chunks(path: &Path) -> Result<Vec<DocumentChunk>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;

    let mut chunks = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        let chunk: DocumentChunk = serde_json::from_str(&line)
            .with_context(|| format!("Invalid chunk on line {} of {:?}", number + 1, path))?;
        chunks.push(chunk);
    }

    tracing::debug!("Read {} chunks from {:?}", chunks.len(), path);
    Ok(chunks)
}

/// Delete every chunk whose source or chunk id matches
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Source or chunk identifier
    pub id: String,

    /// Require the whole source or chunk id to equal ID
    #[arg(long)]
    pub exact: bool,
}

impl DeleteCommand {
    pub async fn execute(&self, store: &VectorStoreService) -> Result<()> {
        tracing::info!("Executing delete command for '{}'", self.id);

        let mode = if self.exact {
            MatchMode::Exact
        } else {
            store.config().delete_match
        };

        match store.try_delete_documents(&self.id, mode).await {
            Ok(removed) => {
                println!(
                    "Deleted {} chunks matching '{}' ({} remain)",
                    removed,
                    self.id,
                    store.get_document_count().await
                );
                Ok(())
            }
            Err(StoreError::NoMatch(id)) => bail!("No chunks match '{}'", id),
            Err(e) => Err(e.into()),
        }
    }
}

/// Remove every stored chunk
#[derive(Args, Debug)]
pub struct ClearCommand {}

impl ClearCommand {
    pub async fn execute(&self, store: &VectorStoreService) -> Result<()> {
        tracing::info!("Executing clear command");

        store.try_clear_all().await?;
        println!("Vector store cleared");

        Ok(())
    }
}

/// List distinct document sources
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListCommand {
    pub async fn execute(&self, store: &VectorStoreService) -> Result<()> {
        let sources = store.list_documents().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&sources)?);
        } else if sources.is_empty() {
            println!("No documents stored");
        } else {
            for source in &sources {
                println!("{}", source);
            }
        }

        Ok(())
    }
}
