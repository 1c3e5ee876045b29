//! Ragvault CLI
//!
//! Main entry point for the ragvault command-line tool.
//! Manages a local vector store for retrieval-augmented generation.

mod commands;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    AddCommand, ClearCommand, DeleteCommand, HealthCommand, ListCommand, SearchCommand,
    StatsCommand,
};
use ragvault_core::{config::AppConfig, logging, LogFormat};
use std::path::PathBuf;

/// Ragvault - local vector store for retrieval-augmented generation
#[derive(Parser, Debug)]
#[command(name = "ragvault")]
#[command(about = "Local vector store for retrieval-augmented generation", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the index and metadata
    #[arg(short, long, global = true, env = "RAGVAULT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log line format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Embedding provider (openai, ollama, trigram)
    #[arg(short, long, global = true, env = "RAGVAULT_PROVIDER")]
    provider: Option<String>,

    /// Embedding model identifier
    #[arg(short, long, global = true, env = "RAGVAULT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed and store chunks from a JSON Lines file
    Add(AddCommand),

    /// Retrieve the chunks most similar to a query
    Search(SearchCommand),

    /// Delete chunks by source or chunk id
    Delete(DeleteCommand),

    /// Remove every stored chunk
    Clear(ClearCommand),

    /// List distinct document sources
    List(ListCommand),

    /// Show vector store statistics
    Stats(StatsCommand),

    /// Check index and metadata consistency
    Health(HealthCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Add(_) => "add",
            Commands::Search(_) => "search",
            Commands::Delete(_) => "delete",
            Commands::Clear(_) => "clear",
            Commands::List(_) => "list",
            Commands::Stats(_) => "stats",
            Commands::Health(_) => "health",
        }
    }

    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Add(_) | Commands::Delete(_) | Commands::Clear(_)
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, config file, then environment
    let config = AppConfig::load_with_file(cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.data_dir,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("Ragvault CLI starting");
    tracing::debug!("Data dir: {:?}", config.data_dir);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_data_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let store = store::open_store(&config).await?;

    let result = match &cli.command {
        Commands::Add(cmd) => cmd.execute(&store).await,
        Commands::Search(cmd) => cmd.execute(&store).await,
        Commands::Delete(cmd) => cmd.execute(&store).await,
        Commands::Clear(cmd) => cmd.execute(&store).await,
        Commands::List(cmd) => cmd.execute(&store).await,
        Commands::Stats(cmd) => cmd.execute(&store).await,
        Commands::Health(cmd) => cmd.execute(&store).await,
    };

    if result.is_ok() && cli.command.mutates() {
        store.flush().await?;
    }

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
