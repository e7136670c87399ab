//! Knowledge retrieval: corpus loading, chunking, and the embedded index.

pub mod chunker;
pub mod corpus;
pub mod index;

pub use chunker::{Chunk, ChunkingConfig, split_document, split_text};
pub use corpus::{Document, fingerprint, load_documents, seed};
pub use index::{IndexMetadata, KnowledgeIndex};
