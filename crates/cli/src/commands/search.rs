//! Search command handler.

use anyhow::Result;
use clap::Args;
use ragvault_store::{VectorStoreService, DEFAULT_TOP_K};

/// Retrieve the chunks most similar to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, store: &VectorStoreService) -> Result<()> {
        tracing::info!("Executing search command (k={})", self.top_k);

        let result = store.search_similar(&self.query, self.top_k).await;

        tracing::debug!(
            "Search took {:.3}s (embedding {:.3}s, scan {:.3}s)",
            result.total_search_time(),
            result.embedding_time,
            result.search_time
        );

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }

        if !result.has_results() {
            println!("No matching chunks");
            return Ok(());
        }

        for (rank, (context, score)) in result
            .contexts
            .iter()
            .zip(&result.similarity_scores)
            .enumerate()
        {
            println!("{}. [{:.3}] {}", rank + 1, score, context);
        }
        println!(
            "\n{} chunks, max score {:.3}, avg {:.3}",
            result.retrieved_chunks,
            result.max_similarity_score(),
            result.avg_similarity_score()
        );

        Ok(())
    }
}
