//! Data models for mathmentor.
//!
//! This module contains the structured records exchanged between pipeline
//! stages. Each stage returns a fresh value; nothing here is mutated in
//! place by a later stage.

mod interaction;
mod problem;
mod solution;

pub use interaction::{Feedback, InputType, InteractionDraft, InteractionRecord};
pub use problem::{ParsedProblem, Topic};
pub use solution::{RetrievedPassage, SolutionBundle, SymbolicResult, VerificationResult};
