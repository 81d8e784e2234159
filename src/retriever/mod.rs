
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::Result;
use crate::embeddings::{EmbeddingCache, EmbeddingProvider};
use crate::index::{FlatIndex, IndexMetadata};

const TITLE_LOG_CHARS: usize = 50;

/// Titles are clipped for log lines by characters, so multibyte Korean text
/// never splits mid-character.
fn log_title(title: &str) -> String {
    title.chars().take(TITLE_LOG_CHARS).collect()
}

/// A ranked search hit joined back to its source listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedListing {
    pub distance: f32,
    pub title: String,
    pub introduction: String,
    pub alltag: String,
    pub address: String,
}

/// Query-time retriever over an index and metadata loaded once at
/// construction and never mutated afterwards.
///
/// Construction fails hard if either artifact is missing or malformed; there
/// is no degraded mode. The provider and cache are injected so callers (and
/// tests) control where embeddings come from.
pub struct Retriever<P: EmbeddingProvider> {
    index: FlatIndex,
    metadata: IndexMetadata,
    cache: EmbeddingCache,
    provider: P,
}

impl<P: EmbeddingProvider> Retriever<P> {
    #[inline]
    pub fn new<I: AsRef<Path>, M: AsRef<Path>>(
        index_path: I,
        metadata_path: M,
        cache: EmbeddingCache,
        provider: P,
    ) -> Result<Self> {
        let index = FlatIndex::open(index_path)?;
        let metadata = IndexMetadata::load(metadata_path)?;

        if index.len() != metadata.items.len() {
            return Err(crate::RagError::Index(format!(
                "Index has {} vectors but metadata has {} items; rebuild both artifacts together",
                index.len(),
                metadata.items.len()
            )));
        }

        info!(
            "Retriever ready: {} vectors, model {}",
            index.len(),
            metadata.embedding_model
        );
        Ok(Self {
            index,
            metadata,
            cache,
            provider,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.metadata.embedding_model
    }

    /// Map a free-text query to the `top_k` most similar listings, nearest
    /// first. Returns `min(top_k, len)` results; an empty query is embedded
    /// like any other string.
    #[inline]
    pub fn retrieve(&mut self, query: &str, top_k: usize) -> Result<Vec<RetrievedListing>> {
        let start = Instant::now();
        info!("Retrieval start: query '{query}', top_k {top_k}");

        let query_vector = self.cache.get_or_compute(query, &self.provider)?;
        let neighbors = self.index.search(&query_vector, top_k)?;

        let results: Vec<RetrievedListing> = neighbors
            .iter()
            .map(|neighbor| {
                let item = &self.metadata.items[neighbor.position];
                RetrievedListing {
                    distance: neighbor.distance,
                    title: item.title().to_string(),
                    introduction: item.introduction().to_string(),
                    alltag: item.tags().to_string(),
                    address: item.address().to_string(),
                }
            })
            .collect();

        let elapsed = start.elapsed();
        let min_distance = results.first().map_or(0.0, |r| r.distance);
        let max_distance = results.last().map_or(0.0, |r| r.distance);
        info!(
            "Retrieval done: {:.3}s, {} results, distance range [{min_distance:.3}, {max_distance:.3}]",
            elapsed.as_secs_f64(),
            results.len()
        );

        for (rank, result) in results.iter().enumerate() {
            let title = log_title(&result.title);
            debug!(
                "  [{}] distance={:.3}, title='{title}'",
                rank + 1,
                result.distance
            );
        }

        Ok(results)
    }
}
