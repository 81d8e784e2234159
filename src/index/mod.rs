#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::corpus::Listing;
use crate::{RagError, Result};

const INDEX_MAGIC: &[u8; 4] = b"JRIX";
const INDEX_VERSION: u32 = 1;

/// Exact nearest-neighbor index over a flat collection of vectors.
///
/// Vectors are stored contiguously in insertion order; position i in the
/// index corresponds to item i of the metadata written in the same build run.
/// Immutable at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

/// A single search hit: the vector's position and its L2 distance from the
/// query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl FlatIndex {
    #[inline]
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Index(
                "Index dimension must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            vectors: Vec::new(),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[inline]
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(RagError::Index(format!(
                "Cannot add a {}-dimension vector to a {}-dimension index",
                vector.len(),
                self.dimension
            )));
        }
        self.vectors.extend_from_slice(vector);
        Ok(())
    }

    #[inline]
    pub fn vector_at(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// Search for the `top_k` nearest vectors by L2 distance.
    ///
    /// Results are sorted by ascending distance; equal distances are ordered
    /// by position. Returns `min(top_k, len)` neighbors.
    #[inline]
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(RagError::Index(format!(
                "Query vector has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| {
                let squared: f32 = row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| a - b)
                    .fold(0.0_f32, |acc, diff| diff.mul_add(diff, acc));
                Neighbor {
                    position,
                    distance: squared.sqrt(),
                }
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(top_k.min(self.len()));

        Ok(neighbors)
    }

    /// Write the index to its binary on-disk format.
    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let count = self.len() as u64;
        let mut buffer =
            Vec::with_capacity(INDEX_MAGIC.len() + 4 + 4 + 8 + self.vectors.len() * 4);
        buffer.extend_from_slice(INDEX_MAGIC);
        buffer.extend_from_slice(&INDEX_VERSION.to_le_bytes());
        buffer.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        buffer.extend_from_slice(&count.to_le_bytes());
        for value in &self.vectors {
            buffer.extend_from_slice(&value.to_le_bytes());
        }

        fs::write(path, buffer)?;
        debug!(
            "Saved index with {} vectors ({} dims) to {}",
            count,
            self.dimension,
            path.display()
        );
        Ok(())
    }

    /// Load an index written by [`FlatIndex::save`]. A missing or malformed
    /// file is a hard error.
    #[inline]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            RagError::Index(format!("Failed to read index file {}: {e}", path.display()))
        })?;

        let malformed = |detail: &str| {
            RagError::Index(format!("Malformed index file {}: {detail}", path.display()))
        };

        let header_len = INDEX_MAGIC.len() + 4 + 4 + 8;
        if bytes.len() < header_len {
            return Err(malformed("truncated header"));
        }
        if &bytes[..4] != INDEX_MAGIC {
            return Err(malformed("bad magic"));
        }

        let read_u32 = |offset: usize| {
            bytes[offset..offset + 4]
                .try_into()
                .map(u32::from_le_bytes)
                .map_err(|_| malformed("truncated header"))
        };
        let version = read_u32(4)?;
        if version != INDEX_VERSION {
            return Err(malformed(&format!("unsupported version {version}")));
        }
        let dimension = read_u32(8)? as usize;
        if dimension == 0 {
            return Err(malformed("zero dimension"));
        }
        let count = bytes[12..20]
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| malformed("truncated header"))? as usize;

        let expected_body = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| malformed("vector count overflow"))?;
        if bytes.len() - header_len != expected_body {
            return Err(malformed("body length does not match header"));
        }

        let vectors: Vec<f32> = bytes[header_len..]
            .chunks_exact(4)
            .map(|chunk| {
                let array: [u8; 4] = chunk.try_into().unwrap_or([0; 4]);
                f32::from_le_bytes(array)
            })
            .collect();

        debug!(
            "Opened index with {} vectors ({} dims) from {}",
            count,
            dimension,
            path.display()
        );
        Ok(Self { dimension, vectors })
    }
}

/// Metadata written alongside the index: the embedding model used and the
/// source listings in index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub embedding_model: String,
    pub items: Vec<Listing>,
}

impl IndexMetadata {
    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // serde_json leaves Korean text unescaped.
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::Index(format!("Failed to serialize metadata: {e}")))?;
        fs::write(path, content)?;
        debug!(
            "Saved metadata with {} items to {}",
            self.items.len(),
            path.display()
        );
        Ok(())
    }

    /// Load the metadata file. A missing or malformed file is a hard error.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RagError::Index(format!(
                "Failed to read metadata file {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RagError::Index(format!(
                "Failed to parse metadata file {}: {e}",
                path.display()
            ))
        })
    }
}
