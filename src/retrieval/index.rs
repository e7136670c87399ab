//! Persistent embedded knowledge index with brute-force cosine retrieval.
//!
//! The index is one JSON file pairing every corpus chunk with its embedding
//! vector, plus metadata pinning the embedding space and chunking parameters
//! it was built with. Loading validates that metadata against the live
//! configuration and rebuilds from the corpus when anything diverges, so a
//! stale or corrupt index never has to be repaired by hand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::embedding::{Embedder, cosine_similarity};
use crate::models::RetrievedPassage;
use crate::{Error, Result};

use super::chunker::{self, ChunkingConfig};
use super::corpus::{self, Document};

/// Build-time parameters recorded alongside the chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Identifier of the embedder that produced the vectors.
    pub embedder_id: String,
    /// Embedding dimensionality.
    pub dimensions: usize,
    /// Chunk size the corpus was split with.
    pub chunk_size: usize,
    /// Chunk overlap the corpus was split with.
    pub chunk_overlap: usize,
    /// Fingerprint of the corpus the index was built from.
    pub corpus_fingerprint: String,
    /// When the index was built.
    pub built_at: DateTime<Utc>,
}

/// One corpus chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    source: String,
    text: String,
    embedding: Vec<f32>,
}

/// On-disk layout of `index.json`.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    metadata: IndexMetadata,
    chunks: Vec<IndexedChunk>,
}

/// In-memory knowledge index backed by a single JSON file.
pub struct KnowledgeIndex {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    metadata: IndexMetadata,
    chunks: Vec<IndexedChunk>,
}

impl std::fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl KnowledgeIndex {
    /// Builds the index from the corpus under `corpus_root` and persists it
    /// to `index_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCorpus`] when no documents are found, and an
    /// error when embedding or persistence fails.
    pub fn build(
        corpus_root: &Path,
        index_path: &Path,
        config: &RetrievalConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let documents = corpus::load_documents(corpus_root);
        Self::build_from_documents(&documents, corpus_root, index_path, config, embedder)
    }

    /// Loads the persisted index, rebuilding from the corpus whenever the
    /// file is missing, unreadable, or was built with a different embedder
    /// or chunking configuration, and whenever the corpus content changed
    /// since the build.
    ///
    /// A readable, compatible index is served as-is when the corpus itself
    /// has gone missing; losing reference documents should not take
    /// retrieval down with them.
    ///
    /// # Errors
    ///
    /// Returns an error when a required rebuild fails.
    pub fn load(
        corpus_root: &Path,
        index_path: &Path,
        config: &RetrievalConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let documents = corpus::load_documents(corpus_root);

        if let Some(file) = Self::try_read(index_path) {
            if let Some(reason) = incompatibility(&file.metadata, config, embedder.as_ref()) {
                tracing::info!(reason, "Rebuilding knowledge index");
                return Self::build_from_documents(
                    &documents,
                    corpus_root,
                    index_path,
                    config,
                    embedder,
                );
            }

            if documents.is_empty() {
                tracing::warn!(
                    corpus = %corpus_root.display(),
                    "Corpus is empty or unreachable; serving the persisted index"
                );
                return Ok(Self::from_file(file, index_path, embedder));
            }

            if file.metadata.corpus_fingerprint == corpus::fingerprint(&documents) {
                tracing::debug!(
                    chunks = file.chunks.len(),
                    "Loaded knowledge index from disk"
                );
                return Ok(Self::from_file(file, index_path, embedder));
            }

            tracing::info!(reason = "corpus_changed", "Rebuilding knowledge index");
        }

        Self::build_from_documents(&documents, corpus_root, index_path, config, embedder)
    }

    /// Returns the `k` most similar chunks to `query`, best first.
    ///
    /// Infallible at the boundary: an embedding failure is logged and yields
    /// an empty result instead of an error.
    #[must_use]
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<RetrievedPassage> {
        if k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let query_embedding = match self.embedder.embed(query) {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed; returning no passages");
                return Vec::new();
            },
        };

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(&query_embedding, &chunk.embedding)))
            .collect();
        // Stable sort keeps corpus order for equal scores.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        tracing::debug!(
            returned = scored.len(),
            top_score = scored.first().map(|(_, s)| *s),
            "Retrieved passages"
        );

        scored
            .into_iter()
            .map(|(i, relevance)| RetrievedPassage {
                content: self.chunks[i].text.clone(),
                relevance,
            })
            .collect()
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Build-time metadata.
    #[must_use]
    pub const fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Chunk counts per source document, sorted by source name.
    #[must_use]
    pub fn sources(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for chunk in &self.chunks {
            *counts.entry(chunk.source.clone()).or_insert(0) += 1;
        }
        counts
    }

    fn from_file(file: IndexFile, index_path: &Path, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            path: index_path.to_path_buf(),
            embedder,
            metadata: file.metadata,
            chunks: file.chunks,
        }
    }

    fn try_read(path: &Path) -> Option<IndexFile> {
        if !path.exists() {
            return None;
        }
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read index file; rebuilding"
                );
                return None;
            },
        };
        match serde_json::from_str(&raw) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Index file is corrupt; rebuilding"
                );
                None
            },
        }
    }

    fn build_from_documents(
        documents: &[Document],
        corpus_root: &Path,
        index_path: &Path,
        config: &RetrievalConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::EmptyCorpus {
                root: corpus_root.to_path_buf(),
            });
        }

        let chunking = ChunkingConfig::from(*config);
        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|document| chunker::split_document(document, &chunking))
            .collect();
        if chunks.is_empty() {
            tracing::warn!("Corpus documents produced no chunks");
        }

        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts)?;

        let indexed = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk {
                source: chunk.source,
                text: chunk.text,
                embedding,
            })
            .collect();

        let index = Self {
            path: index_path.to_path_buf(),
            metadata: IndexMetadata {
                embedder_id: embedder.id(),
                dimensions: embedder.dimensions(),
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
                corpus_fingerprint: corpus::fingerprint(documents),
                built_at: Utc::now(),
            },
            embedder,
            chunks: indexed,
        };
        index.persist()?;

        tracing::info!(
            documents = documents.len(),
            chunks = index.chunks.len(),
            embedder = %index.metadata.embedder_id,
            "Built knowledge index"
        );
        Ok(index)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_index_dir".to_string(),
                cause: format!("{}: {}", parent.display(), e),
            })?;
        }

        let file = IndexFile {
            metadata: self.metadata.clone(),
            chunks: self.chunks.clone(),
        };
        // Compact encoding; embedding vectors dominate the payload.
        let payload = serde_json::to_string(&file).map_err(|e| Error::OperationFailed {
            operation: "encode_index".to_string(),
            cause: e.to_string(),
        })?;
        std::fs::write(&self.path, payload).map_err(|e| Error::OperationFailed {
            operation: "write_index".to_string(),
            cause: format!("{}: {}", self.path.display(), e),
        })
    }
}

/// Why a persisted index cannot be served under the current configuration,
/// or `None` when it can.
fn incompatibility(
    metadata: &IndexMetadata,
    config: &RetrievalConfig,
    embedder: &dyn Embedder,
) -> Option<&'static str> {
    if metadata.embedder_id != embedder.id() {
        return Some("embedder_changed");
    }
    if metadata.dimensions != embedder.dimensions() {
        return Some("dimensions_changed");
    }
    if metadata.chunk_size != config.chunk_size || metadata.chunk_overlap != config.chunk_overlap {
        return Some("chunking_changed");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use tempfile::TempDir;

    fn test_config() -> RetrievalConfig {
        RetrievalConfig::default()
    }

    fn seeded_corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        corpus::seed(dir.path()).unwrap();
        dir
    }

    #[test]
    fn test_build_fails_on_empty_corpus() {
        let corpus_dir = TempDir::new().unwrap();
        let index_dir = TempDir::new().unwrap();

        let result = KnowledgeIndex::build(
            corpus_dir.path(),
            &index_dir.path().join("index.json"),
            &test_config(),
            Arc::new(HashEmbedder::new()),
        );
        assert!(matches!(result, Err(Error::EmptyCorpus { .. })));
    }

    #[test]
    fn test_build_and_retrieve() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("index.json");

        let index = KnowledgeIndex::build(
            corpus_dir.path(),
            &index_path,
            &test_config(),
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();

        assert!(!index.is_empty());
        assert!(index_path.exists());
        assert_eq!(index.metadata().embedder_id, "hash-384");
        assert_eq!(index.metadata().dimensions, 384);

        let passages = index.retrieve("quadratic formula discriminant", 3);
        assert!(!passages.is_empty());
        assert!(passages.len() <= 3);
        for pair in passages.windows(2) {
            assert!(pair[0].relevance >= pair[1].relevance);
        }
    }

    #[test]
    fn test_retrieve_zero_k_is_empty() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();

        let index = KnowledgeIndex::build(
            corpus_dir.path(),
            &index_dir.path().join("index.json"),
            &test_config(),
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();

        assert!(index.retrieve("anything", 0).is_empty());
    }

    #[test]
    fn test_retrieve_is_deterministic() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();

        let index = KnowledgeIndex::build(
            corpus_dir.path(),
            &index_dir.path().join("index.json"),
            &test_config(),
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();

        let first = index.retrieve("matrix determinant", 3);
        let second = index.retrieve("matrix determinant", 3);
        let texts = |hits: &[crate::models::RetrievedPassage]| {
            hits.iter().map(|p| p.content.clone()).collect::<Vec<_>>()
        };
        assert_eq!(texts(&first), texts(&second));
    }

    #[test]
    fn test_load_reuses_persisted_index() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("index.json");
        let config = test_config();

        let built = KnowledgeIndex::build(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        let built_at = built.metadata().built_at;

        let loaded = KnowledgeIndex::load(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        assert_eq!(loaded.metadata().built_at, built_at);
        assert_eq!(loaded.len(), built.len());
    }

    #[test]
    fn test_load_builds_when_missing() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("index.json");

        let index = KnowledgeIndex::load(
            corpus_dir.path(),
            &index_path,
            &test_config(),
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        assert!(!index.is_empty());
        assert!(index_path.exists());
    }

    #[test]
    fn test_load_rebuilds_on_corrupt_file() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("index.json");
        std::fs::write(&index_path, "not json at all").unwrap();

        let index = KnowledgeIndex::load(
            corpus_dir.path(),
            &index_path,
            &test_config(),
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        assert!(!index.is_empty());
    }

    #[test]
    fn test_load_rebuilds_on_embedder_change() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("index.json");
        let config = test_config();

        KnowledgeIndex::build(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(HashEmbedder::with_dimensions(128)),
        )
        .unwrap();

        let reloaded = KnowledgeIndex::load(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        assert_eq!(reloaded.metadata().embedder_id, "hash-384");
        assert_eq!(reloaded.metadata().dimensions, 384);
    }

    #[test]
    fn test_load_rebuilds_on_corpus_change() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("index.json");
        let config = test_config();

        let built = KnowledgeIndex::build(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        let old_fingerprint = built.metadata().corpus_fingerprint.clone();

        std::fs::write(
            corpus_dir.path().join("topology_formulas.txt"),
            "Euler characteristic: V - E + F = 2 for convex polyhedra\n",
        )
        .unwrap();

        let reloaded = KnowledgeIndex::load(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        assert_ne!(reloaded.metadata().corpus_fingerprint, old_fingerprint);
        assert!(reloaded.len() > built.len());
    }

    #[test]
    fn test_load_serves_index_when_corpus_is_gone() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("index.json");
        let config = test_config();

        let built = KnowledgeIndex::build(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        let chunk_count = built.len();
        let missing = corpus_dir.path().join("never-created");

        let loaded = KnowledgeIndex::load(
            &missing,
            &index_path,
            &config,
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();
        assert_eq!(loaded.len(), chunk_count);
    }

    /// Advertises the same embedding space as [`HashEmbedder`] but fails
    /// every call, standing in for an embedder outage at query time.
    struct OfflineEmbedder;

    impl Embedder for OfflineEmbedder {
        fn id(&self) -> String {
            "hash-384".to_string()
        }

        fn dimensions(&self) -> usize {
            384
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::OperationFailed {
                operation: "embed".to_string(),
                cause: "embedder offline".to_string(),
            })
        }
    }

    #[test]
    fn test_retrieve_survives_embedder_outage() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("index.json");
        let config = test_config();

        KnowledgeIndex::build(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();

        let index = KnowledgeIndex::load(
            corpus_dir.path(),
            &index_path,
            &config,
            Arc::new(OfflineEmbedder),
        )
        .unwrap();

        assert!(!index.is_empty());
        assert!(index.retrieve("quadratic formula", 3).is_empty());
    }

    #[test]
    fn test_sources_counts_every_document() {
        let corpus_dir = seeded_corpus();
        let index_dir = TempDir::new().unwrap();

        let index = KnowledgeIndex::build(
            corpus_dir.path(),
            &index_dir.path().join("index.json"),
            &test_config(),
            Arc::new(HashEmbedder::new()),
        )
        .unwrap();

        let sources = index.sources();
        assert_eq!(sources.len(), 4);
        assert!(sources.contains_key("algebra_formulas.txt"));
        assert!(sources.values().all(|&count| count >= 1));
    }
}
