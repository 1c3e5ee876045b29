//! Stats and health command handlers.

use anyhow::{bail, Result};
use clap::Args;
use ragvault_store::VectorStoreService;

/// Show vector store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, store: &VectorStoreService) -> Result<()> {
        tracing::info!("Executing stats command");

        let stats = store.stats().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Vector store: {}", store.config().root.display());
            println!("  Chunks: {}", stats.total_chunks);
            println!("  Documents: {}", stats.unique_documents);
            println!("  Chunks per document: {:.1}", stats.avg_chunks_per_document);
            println!("  Dimension: {}", stats.dimension);
            println!("  Index size: {}", stats.index_size);
        }

        Ok(())
    }
}

/// Check that the index and metadata agree
#[derive(Args, Debug)]
pub struct HealthCommand {}

impl HealthCommand {
    pub async fn execute(&self, store: &VectorStoreService) -> Result<()> {
        if !store.health_check().await {
            bail!("Vector store is unhealthy");
        }
        println!("ok");
        Ok(())
    }
}
