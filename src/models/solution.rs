//! Solution and verification records.

use serde::{Deserialize, Serialize};

/// A knowledge chunk returned by retrieval, scored against the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Chunk text supplied to the solver as grounding context.
    pub content: String,
    /// Cosine similarity between query and chunk embeddings. Higher is more
    /// relevant; the same orientation is used for every score in the crate.
    pub relevance: f32,
}

/// Outcome of the exact symbolic solving attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolicResult {
    /// The input contained a solvable equation.
    Solved {
        /// Equation as understood by the solver, normalized form.
        equation: String,
        /// Exact solutions rendered as strings. Empty when every value
        /// satisfies the equation.
        solutions: Vec<String>,
    },
    /// The input does not look like a single-variable equation, so no
    /// attempt was made.
    NotApplicable {
        /// Short explanation of why the solver did not engage.
        reason: String,
    },
    /// The solver engaged but could not produce a solution.
    Failed {
        /// Error text, reproduced verbatim in the narrative solution.
        error: String,
    },
}

impl SymbolicResult {
    /// True only for the `Solved` variant.
    #[must_use]
    pub const fn is_solved(&self) -> bool {
        matches!(self, Self::Solved { .. })
    }
}

/// Everything the reasoning stage produced for one problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionBundle {
    /// Step-by-step narrative solution from the generator.
    pub narrative: String,
    /// Result of the exact symbolic attempt that ran alongside.
    pub symbolic: SymbolicResult,
    /// Passages retrieved as grounding context, most relevant first.
    pub retrieved: Vec<RetrievedPassage>,
    /// Stage self-confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

/// Verdict from the verification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the judge considers the solution correct.
    pub is_correct: bool,
    /// Judge confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// Specific problems the judge found, empty when none.
    #[serde(default)]
    pub issues: Vec<String>,
    /// True when a human should look at the solution before it is trusted.
    #[serde(default)]
    pub needs_human_review: bool,
}

impl VerificationResult {
    /// Verdict used when the judge's reply cannot be decoded.
    ///
    /// Assumes the solution is correct at reduced confidence rather than
    /// blocking the pipeline. A wrong solution can slip through unflagged
    /// on this path, so every use is logged and counted.
    #[must_use]
    pub fn optimistic_default() -> Self {
        Self {
            is_correct: true,
            confidence: 0.7,
            issues: Vec::new(),
            needs_human_review: false,
        }
    }
}
