
use std::path::Path;
use tracing::info;

use crate::Result;
use crate::corpus::Listing;
use crate::embeddings::EmbeddingProvider;
use crate::index::{FlatIndex, IndexMetadata};

/// Offline builder: turns a corpus of listings into a flat index plus
/// positionally aligned metadata.
///
/// Corpus texts are always embedded fresh; the query cache is not consulted
/// here, since document texts are not user queries.
pub struct IndexBuilder<'a, P: EmbeddingProvider> {
    provider: &'a P,
    model: String,
    dimension: usize,
}

/// The two artifacts of one build run. Writing them together is what keeps
/// vector order and item order aligned.
#[derive(Debug)]
pub struct BuiltIndex {
    pub index: FlatIndex,
    pub metadata: IndexMetadata,
}

impl<'a, P: EmbeddingProvider> IndexBuilder<'a, P> {
    #[inline]
    pub fn new(provider: &'a P, model: &str, dimension: usize) -> Self {
        Self {
            provider,
            model: model.to_string(),
            dimension,
        }
    }

    /// Embed every listing's document text and assemble the index.
    ///
    /// Vector i corresponds to `listings[i]`; the returned index always has
    /// exactly as many vectors as there are listings.
    #[inline]
    pub fn build(&self, listings: &[Listing]) -> Result<BuiltIndex> {
        let texts: Vec<String> = listings.iter().map(Listing::document_text).collect();
        info!("Building index for {} listings", listings.len());

        let vectors = self.provider.embed_batch(&texts)?;

        let mut index = FlatIndex::new(self.dimension)?;
        for vector in &vectors {
            index.add(vector)?;
        }

        let metadata = IndexMetadata {
            embedding_model: self.model.clone(),
            items: listings.to_vec(),
        };

        info!(
            "Built index: {} vectors, {} dims, model {}",
            index.len(),
            index.dimension(),
            metadata.embedding_model
        );
        Ok(BuiltIndex { index, metadata })
    }
}

/// Persist both artifacts of a build run.
#[inline]
pub fn write_artifacts<P: AsRef<Path>, Q: AsRef<Path>>(
    built: &BuiltIndex,
    index_path: P,
    metadata_path: Q,
) -> Result<()> {
    built.index.save(&index_path)?;
    built.metadata.save(&metadata_path)?;
    info!(
        "Wrote index to {} and metadata to {}",
        index_path.as_ref().display(),
        metadata_path.as_ref().display()
    );
    Ok(())
}
