use clap::{Parser, Subcommand};
use jeju_rag::Result;
use jeju_rag::commands::{build_index, fetch_corpus, search, show_config, warm_up};
use jeju_rag::config::{Config, DEFAULT_TOP_K, get_config_dir};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jeju-rag")]
#[command(about = "Similarity search over VisitJeju one-day class listings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the workshop corpus from the VisitJeju API
    Fetch,
    /// Build the vector index and metadata from the corpus file
    Build {
        /// Path to the corpus JSON array (defaults to the configured path)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Retrieve listings similar to a free-text query
    Search {
        /// The query text
        query: String,
        /// Number of results to return
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Precompute embeddings for the configured warm-up queries
    Warmup,
    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(get_config_dir()?)?;

    match cli.command {
        Commands::Fetch => fetch_corpus(&config)?,
        Commands::Build { corpus } => build_index(&config, corpus)?,
        Commands::Search { query, top_k } => search(&config, &query, top_k)?,
        Commands::Warmup => warm_up(&config)?,
        Commands::Config => show_config(&config)?,
    }

    Ok(())
}
