//! FastEmbed-based embedder.
//!
//! Real semantic embeddings using the all-MiniLM-L6-v2 model via
//! fastembed-rs. Only compiled with the `fastembed-embeddings` feature.

use super::{DEFAULT_DIMENSIONS, Embedder};
use crate::{Error, Result};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use std::time::Instant;

/// Thread-safe singleton for the embedding model, lazily initialized on
/// first use.
static EMBEDDING_MODEL: OnceLock<fastembed::TextEmbedding> = OnceLock::new();

/// `FastEmbed` embedder using all-MiniLM-L6-v2.
///
/// The model is lazily loaded on the first embed call to preserve cold
/// start time; the first call blocks for the ONNX model load.
pub struct FastEmbedEmbedder {
    /// Model name for logging and for the embedding-space id.
    model_name: &'static str,
}

impl FastEmbedEmbedder {
    /// Embedding dimensions for all-MiniLM-L6-v2.
    pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

    /// Creates a new `FastEmbed` embedder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            model_name: "all-MiniLM-L6-v2",
        }
    }

    /// Gets or initializes the embedding model (thread-safe).
    fn get_model() -> Result<&'static fastembed::TextEmbedding> {
        if let Some(model) = EMBEDDING_MODEL.get() {
            return Ok(model);
        }

        tracing::info!("Loading embedding model (first use)...");
        let start = Instant::now();

        let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(false);

        let model =
            fastembed::TextEmbedding::try_new(options).map_err(|e| Error::OperationFailed {
                operation: "load_embedding_model".to_string(),
                cause: e.to_string(),
            })?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            model = "all-MiniLM-L6-v2",
            "Embedding model loaded successfully"
        );

        // Store the model, ignoring if another thread beat us to it
        let _ = EMBEDDING_MODEL.set(model);
        EMBEDDING_MODEL.get().ok_or_else(|| Error::OperationFailed {
            operation: "get_embedding_model".to_string(),
            cause: "Model initialization race condition".to_string(),
        })
    }

    /// Returns the model name.
    #[must_use]
    pub const fn model_name(&self) -> &'static str {
        self.model_name
    }
}

impl Default for FastEmbedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for FastEmbedEmbedder {
    fn id(&self) -> String {
        self.model_name.to_string()
    }

    fn dimensions(&self) -> usize {
        Self::DEFAULT_DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
        }

        let model = Self::get_model()?;
        let text_owned = text.to_string();

        // The ONNX runtime can panic on malformed inputs; contain it here
        let result = catch_unwind(AssertUnwindSafe(|| model.embed(vec![text_owned], None)));

        let embeddings = result
            .map_err(|panic_info| {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    panic_message = %panic_msg,
                    "ONNX runtime panicked during embedding"
                );
                Error::OperationFailed {
                    operation: "embed".to_string(),
                    cause: format!("ONNX runtime panic: {panic_msg}"),
                }
            })?
            .map_err(|e| Error::OperationFailed {
                operation: "embed".to_string(),
                cause: e.to_string(),
            })?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::OperationFailed {
                operation: "embed".to_string(),
                cause: "No embedding returned from model".to_string(),
            })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if texts.iter().any(|t| t.is_empty()) {
            return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
        }

        let model = Self::get_model()?;
        let texts_owned: Vec<String> = texts.iter().map(|s| (*s).to_string()).collect();

        let result = catch_unwind(AssertUnwindSafe(|| model.embed(texts_owned, None)));

        result
            .map_err(|panic_info| {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    panic_message = %panic_msg,
                    batch_size = texts.len(),
                    "ONNX runtime panicked during batch embedding"
                );
                Error::OperationFailed {
                    operation: "embed_batch".to_string(),
                    cause: format!("ONNX runtime panic: {panic_msg}"),
                }
            })?
            .map_err(|e| Error::OperationFailed {
                operation: "embed_batch".to_string(),
                cause: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_embedder_creation() {
        let embedder = FastEmbedEmbedder::new();
        assert_eq!(embedder.dimensions(), FastEmbedEmbedder::DEFAULT_DIMENSIONS);
        assert_eq!(embedder.id(), "all-MiniLM-L6-v2");
    }

    #[test]
    fn test_embed_empty_text() {
        let embedder = FastEmbedEmbedder::new();
        let result = embedder.embed("");
        assert!(result.is_err());
    }

    #[test]
    fn test_embed_batch_empty_list() {
        let embedder = FastEmbedEmbedder::new();
        let texts: Vec<&str> = vec![];

        let result = embedder.embed_batch(&texts);
        assert!(result.is_ok());
        assert!(result.expect("embed_batch failed").is_empty());
    }

    #[test]
    fn test_embed_success() {
        let embedder = FastEmbedEmbedder::new();
        let result = embedder.embed("Solve the quadratic equation x^2 - 4 = 0");

        assert!(result.is_ok());
        let embedding = result.expect("embed failed");
        assert_eq!(embedding.len(), FastEmbedEmbedder::DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_semantic_similarity_related_text() {
        let embedder = FastEmbedEmbedder::new();

        let emb_derive = embedder
            .embed("derivative of a polynomial")
            .expect("embed failed");
        let emb_diff = embedder
            .embed("differentiate the polynomial function")
            .expect("embed failed");
        let emb_other = embedder
            .embed("probability of rolling two dice")
            .expect("embed failed");

        let sim_related = cosine_similarity(&emb_derive, &emb_diff);
        let sim_unrelated = cosine_similarity(&emb_derive, &emb_other);

        assert!(
            sim_related > sim_unrelated,
            "Related text ({sim_related}) should be more similar than unrelated ({sim_unrelated})"
        );
    }
}
