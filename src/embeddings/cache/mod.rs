
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::embeddings::EmbeddingProvider;
use crate::{RagError, Result};

/// Persistent query-text → embedding-vector cache.
///
/// Keys are raw query strings with no normalization, so differently phrased
/// or differently spaced queries are distinct entries. Entries are never
/// evicted. The file is rewritten after every insertion; a write failure is
/// logged and swallowed, leaving the in-memory cache authoritative for the
/// rest of the process. Concurrent writers race last-writer-wins; the cache
/// is an optimization, never a source of truth.
#[derive(Debug)]
pub struct EmbeddingCache {
    path: PathBuf,
    entries: HashMap<String, Vec<f32>>,
}

impl EmbeddingCache {
    /// Load the cache file. An absent or corrupt file yields an empty cache.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "Embedding cache at {} is corrupt, starting empty: {e}",
                        path.display()
                    );
                    HashMap::new()
                }
            },
            Err(_) => {
                debug!("No embedding cache at {}, starting empty", path.display());
                HashMap::new()
            }
        };

        debug!(
            "Loaded embedding cache with {} entries from {}",
            entries.len(),
            path.display()
        );
        Self { path, entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    #[inline]
    pub fn get(&self, query: &str) -> Option<&[f32]> {
        self.entries.get(query).map(Vec::as_slice)
    }

    /// Return the cached vector for `query`, or embed it as a single-item
    /// batch, cache it, and persist.
    #[inline]
    pub fn get_or_compute<P: EmbeddingProvider>(
        &mut self,
        query: &str,
        provider: &P,
    ) -> Result<Vec<f32>> {
        if let Some(vector) = self.entries.get(query) {
            debug!("Embedding cache hit for query ({} chars)", query.chars().count());
            return Ok(vector.clone());
        }

        let vector = provider.embed_one(query)?;
        self.entries.insert(query.to_string(), vector.clone());
        self.persist_best_effort();

        Ok(vector)
    }

    /// Precompute embeddings for every query not already cached, in one batch
    /// call, persisting once. Returns the number of new entries.
    #[inline]
    pub fn warm_up<P: EmbeddingProvider>(
        &mut self,
        queries: &[String],
        provider: &P,
    ) -> Result<usize> {
        let missing: Vec<String> = queries
            .iter()
            .filter(|query| !self.entries.contains_key(query.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            debug!("Embedding cache already warm for {} queries", queries.len());
            return Ok(0);
        }

        let vectors = provider.embed_batch(&missing)?;
        if vectors.len() != missing.len() {
            return Err(RagError::Embedding(format!(
                "Provider returned {} vectors for {} warm-up queries",
                vectors.len(),
                missing.len()
            )));
        }

        for (query, vector) in missing.iter().zip(vectors) {
            self.entries.insert(query.clone(), vector);
        }
        self.persist_best_effort();

        debug!("Warmed up embedding cache with {} new queries", missing.len());
        Ok(missing.len())
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(&self.entries)
            .map_err(|e| RagError::Embedding(format!("Failed to serialize cache: {e}")))?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Persistence is best-effort: a failed write must never abort retrieval.
    fn persist_best_effort(&self) {
        if let Err(e) = self.persist() {
            warn!(
                "Failed to persist embedding cache to {}: {e}",
                self.path.display()
            );
        }
    }
}
