use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::builder::{IndexBuilder, write_artifacts};
use crate::config::Config;
use crate::corpus;
use crate::embeddings::{EmbeddingCache, OpenAiClient};
use crate::fetch::{self, VisitJejuClient};
use crate::retriever::Retriever;

/// Fetch the listing corpus from the VisitJeju SearchList API, keep the
/// workshop-like entries, and write the corpus file the index build reads.
#[inline]
pub fn fetch_corpus(config: &Config) -> Result<()> {
    let client = VisitJejuClient::new(&config.visitjeju)?;

    let items = client.fetch_all()?;
    println!("Fetched {} listings", items.len());

    let workshops = fetch::filter_workshops(items);
    println!("Kept {} workshop listings", workshops.len());

    let corpus_path = config.corpus_path();
    corpus::save_corpus(&workshops, &corpus_path)?;
    println!("Saved corpus to {}", corpus_path.display());

    for item in workshops.iter().take(10) {
        println!("  - {} | {} | {}", item.title(), item.address(), item.tags());
    }

    Ok(())
}

/// Build the index and metadata artifacts from the corpus file, then warm up
/// the embedding cache for the configured queries.
#[inline]
pub fn build_index(config: &Config, corpus_path: Option<PathBuf>) -> Result<()> {
    let corpus_path = corpus_path.unwrap_or_else(|| config.corpus_path());
    let listings = corpus::load_corpus(&corpus_path)?;
    println!(
        "Loaded {} listings from {}",
        listings.len(),
        corpus_path.display()
    );

    let client = OpenAiClient::new(&config.openai)?;
    let builder = IndexBuilder::new(
        &client,
        &config.openai.model,
        config.openai.embedding_dimension as usize,
    );

    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} Embedding {msg} documents")
                .context("progress style template should be valid")?,
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(listings.len().to_string());
    bar.enable_steady_tick(Duration::from_millis(100));

    let built = builder.build(&listings)?;
    bar.finish_and_clear();

    write_artifacts(&built, config.index_path(), config.metadata_path())?;
    println!(
        "Indexed {} listings with model {}",
        built.index.len(),
        built.metadata.embedding_model
    );
    println!("  Index:    {}", config.index_path().display());
    println!("  Metadata: {}", config.metadata_path().display());

    let mut cache = EmbeddingCache::load(config.embedding_cache_path());
    let added = cache.warm_up(&config.warmup_queries, &client)?;
    println!("Warmed up embedding cache ({added} new queries)");

    Ok(())
}

/// Retrieve the listings most similar to a free-text query and print them.
#[inline]
pub fn search(config: &Config, query: &str, top_k: usize) -> Result<()> {
    let client = OpenAiClient::new(&config.openai)?;
    let cache = EmbeddingCache::load(config.embedding_cache_path());
    let mut retriever = Retriever::new(
        config.index_path(),
        config.metadata_path(),
        cache,
        client,
    )?;

    let results = retriever.retrieve(query, top_k)?;
    if results.is_empty() {
        println!("No similar listings found.");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} (distance {:.3})",
            rank + 1,
            result.title,
            result.distance
        );
        if !result.introduction.is_empty() {
            println!("   {}", result.introduction);
        }
        if !result.alltag.is_empty() {
            println!("   태그: {}", result.alltag);
        }
        if !result.address.is_empty() {
            println!("   주소: {}", result.address);
        }
    }

    Ok(())
}

/// Precompute embeddings for the configured warm-up queries.
#[inline]
pub fn warm_up(config: &Config) -> Result<()> {
    let client = OpenAiClient::new(&config.openai)?;
    let mut cache = EmbeddingCache::load(config.embedding_cache_path());

    info!("Warming up {} queries", config.warmup_queries.len());
    let added = cache.warm_up(&config.warmup_queries, &client)?;

    if added == 0 {
        println!("Embedding cache already warm ({} entries)", cache.len());
    } else {
        println!(
            "Added {added} embeddings to the cache ({} entries total)",
            cache.len()
        );
    }

    Ok(())
}

/// Print the effective configuration as TOML.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("# {}", config.config_file_path().display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config to TOML")?
    );
    Ok(())
}
