//! Embedding generation.
//!
//! Provides the embedding seam for the knowledge index: a deterministic
//! hash-projection embedder by default, and real semantic embeddings via
//! fastembed when the `fastembed-embeddings` feature is on.

// Allow cast precision loss for hash-based embedding calculations.
#![allow(clippy::cast_precision_loss)]
// Allow cast possible truncation for hash index calculations on 32-bit platforms.
#![allow(clippy::cast_possible_truncation)]

mod hash;

#[cfg(feature = "fastembed-embeddings")]
mod fastembed;

pub use hash::HashEmbedder;

#[cfg(feature = "fastembed-embeddings")]
pub use fastembed::FastEmbedEmbedder;

use crate::Result;
use std::sync::Arc;

/// Default embedding dimensions (all-MiniLM-L6-v2 output size).
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Trait for embedding generators.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the embedding space this embedder produces.
    ///
    /// Persisted in index metadata; an index built under one id is never
    /// queried under another.
    fn id(&self) -> String;

    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Builds the default embedder for this build of the crate.
#[must_use]
pub fn build_embedder() -> Arc<dyn Embedder> {
    #[cfg(feature = "fastembed-embeddings")]
    {
        Arc::new(FastEmbedEmbedder::new())
    }
    #[cfg(not(feature = "fastembed-embeddings"))]
    {
        Arc::new(HashEmbedder::new())
    }
}

/// Computes cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, higher meaning more similar, or `0.0`
/// when the vectors are empty or of mismatched length.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
