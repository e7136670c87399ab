//! Explanation stage: rewrites the solution as a student-facing walkthrough.

use std::sync::Arc;

use crate::Result;
use crate::llm::TextGenerator;

const SYSTEM_PROMPT: &str = r#"You are a friendly math tutor. Explain solutions clearly:
1. **Problem Understanding**: Restate what we're looking for
2. **Approach**: Explain the method in simple terms
3. **Step-by-Step**: Walk through each step with reasoning
4. **Answer**: State the final answer clearly
5. **Key Concepts**: List the concepts used

Use simple language, avoid jargon, and be encouraging."#;

/// Warmer than the other stages; the walkthrough should read naturally
/// rather than deterministically.
const TEMPERATURE: f32 = 0.3;

/// Produces the pedagogical explanation of a solved problem.
pub struct Explainer {
    generator: Arc<dyn TextGenerator>,
}

impl Explainer {
    /// Creates an explainer over the given generator.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Explains a solution.
    ///
    /// # Errors
    ///
    /// Returns an error when generation fails. Unlike the earlier stages
    /// there is no degraded output worth shipping here; the caller decides
    /// how to present the absence of an explanation.
    pub fn explain(&self, problem: &str, solution: &str) -> Result<String> {
        let user = format!("Problem: {problem}\n\nSolution: {solution}\n\nExplain this clearly.");
        self.generator.generate(SYSTEM_PROMPT, &user, TEMPERATURE)
    }
}
