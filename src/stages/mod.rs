//! Pipeline stages.
//!
//! Each stage is a small service over the shared [`TextGenerator`] seam.
//! The parser, solver, and verifier degrade instead of failing, recording a
//! fallback when they do; the explainer surfaces its errors and leaves the
//! presentation to the caller.
//!
//! [`TextGenerator`]: crate::llm::TextGenerator

mod explainer;
mod parser;
mod reasoning;
mod verifier;

pub use explainer::Explainer;
pub use parser::ProblemParser;
pub use reasoning::ReasoningSolver;
pub use verifier::Verifier;
