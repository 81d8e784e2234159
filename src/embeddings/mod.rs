// Embeddings module: provider boundary and the persistent query cache.

pub mod cache;
pub mod openai;

pub use cache::EmbeddingCache;
pub use openai::OpenAiClient;

use crate::{RagError, Result};

/// Dimension of `text-embedding-3-small` vectors.
pub const EMBEDDING_DIMENSION: usize = 1536;

/// The only boundary with the external embedding service: a batch of strings
/// in, one vector per string out, order preserved.
///
/// Implementations do not retry; provider failures propagate to the caller.
pub trait EmbeddingProvider {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Convenience wrapper: embeds a single-item batch.
    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(std::slice::from_ref(&text.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Provider returned no embedding".to_string()))
    }
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for &P {
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}
