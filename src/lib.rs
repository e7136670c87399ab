//! # Mathmentor
//!
//! A retrieval-augmented reasoning pipeline for math tutoring.
//!
//! Mathmentor answers free-form math questions by chaining specialized
//! stages: a problem parser, a hybrid symbolic/statistical solver grounded
//! in a local knowledge index, an independent verifier, and a pedagogical
//! explainer. Completed interactions accumulate in a durable memory log
//! that supports similarity-based recall of prior problems.
//!
//! ## Features
//!
//! - Structured stage contracts with decode-or-fallback at every service
//!   boundary (a failed stage degrades, it never aborts the run)
//! - Exact symbolic solving for equation-shaped input, advisory to the
//!   narrative solution
//! - Chunked, embedded knowledge index persisted locally and rebuilt
//!   automatically when missing or stale
//! - Jaccard-similarity recall over the interaction history
//!
//! ## Example
//!
//! ```rust,ignore
//! use mathmentor::{MentorConfig, Pipeline};
//! use mathmentor::models::InputType;
//!
//! let pipeline = Pipeline::new(MentorConfig::load_default())?;
//! let outcome = pipeline.run("Solve 2*x + 3 = 7", InputType::Text)?;
//! println!("{}", outcome.explanation);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod embedding;
pub mod intake;
pub mod llm;
pub mod memory;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod retrieval;
pub mod solver;
pub mod stages;

// Re-exports for convenience
pub use config::{LlmConfig, MentorConfig};
pub use embedding::Embedder;
pub use llm::TextGenerator;
pub use memory::{MemoryStore, RecallHit};
pub use models::{
    Feedback, InputType, InteractionRecord, ParsedProblem, RetrievedPassage, SolutionBundle,
    SymbolicResult, Topic, VerificationResult,
};
pub use pipeline::{InteractionOutcome, Pipeline};
pub use retrieval::KnowledgeIndex;

/// Error type for mathmentor operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// Stage boundaries deliberately do not surface most of these: each pipeline
/// stage converts its own failures into the documented fallback contract
/// (see the `stages` module), so `Error` reaches callers only from
/// persistence, configuration, and index maintenance paths.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - The problem text handed to the pipeline is empty
    /// - A configuration value fails validation (e.g., zero chunk size)
    /// - A persisted file has an incompatible shape
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - An LLM or embedding request fails
    /// - Filesystem I/O errors occur
    /// - A persisted index or memory log cannot be written
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The knowledge corpus contains no documents.
    ///
    /// Raised by index builds when zero reference documents are discovered
    /// under the corpus root.
    #[error("knowledge corpus at '{}' contains no documents", root.display())]
    EmptyCorpus {
        /// The corpus root that was scanned.
        root: PathBuf,
    },
}

/// Result type alias for mathmentor operations.
pub type Result<T> = std::result::Result<T, Error>;
