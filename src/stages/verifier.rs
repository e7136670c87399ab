//! Verification stage: an LLM judge reviews the narrative solution.

use std::sync::Arc;

use crate::llm::{self, TextGenerator};
use crate::models::VerificationResult;
use crate::observability::{FallbackCounters, FallbackKind};

const SYSTEM_PROMPT: &str = r#"You are a math solution verifier. Check the solution for:
1. Mathematical correctness
2. Unit consistency
3. Domain validity (e.g., no negative square roots, division by zero)
4. Edge cases

Respond with JSON:
{
  "is_correct": true/false,
  "confidence": 0.95,
  "issues": ["list of issues found"],
  "needs_human_review": false
}"#;

const TEMPERATURE: f32 = 0.0;

/// Judges a solution against its problem and returns a structured verdict.
pub struct Verifier {
    generator: Arc<dyn TextGenerator>,
    counters: Arc<FallbackCounters>,
}

impl Verifier {
    /// Creates a verifier over the given generator.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, counters: Arc<FallbackCounters>) -> Self {
        Self {
            generator,
            counters,
        }
    }

    /// Verifies a solution.
    ///
    /// Infallible at this boundary: when the judge cannot be reached or its
    /// reply cannot be decoded, the verdict degrades to
    /// [`VerificationResult::optimistic_default`], logged and counted.
    #[must_use]
    pub fn verify(&self, problem: &str, solution: &str) -> VerificationResult {
        let user = format!("Problem: {problem}\n\nSolution: {solution}\n\nVerify this solution.");

        let response = match self.generator.generate(SYSTEM_PROMPT, &user, TEMPERATURE) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Verification failed; assuming solution is correct");
                self.counters.record(FallbackKind::Verifier);
                return VerificationResult::optimistic_default();
            },
        };

        match serde_json::from_str::<VerificationResult>(llm::extract_json(&response)) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "Judge reply was not valid JSON; assuming correct");
                self.counters.record(FallbackKind::Verifier);
                VerificationResult::optimistic_default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;

    struct FixedGenerator(String);

    impl TextGenerator for FixedGenerator {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn generate(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn generate(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
            Err(crate::Error::OperationFailed {
                operation: "generate".to_string(),
                cause: "provider offline".to_string(),
            })
        }
    }

    fn verifier_with(response: &str) -> (Verifier, Arc<FallbackCounters>) {
        let counters = Arc::new(FallbackCounters::new());
        let verifier = Verifier::new(
            Arc::new(FixedGenerator(response.to_string())),
            Arc::clone(&counters),
        );
        (verifier, counters)
    }

    #[test]
    fn test_decodes_negative_verdict() {
        let (verifier, counters) = verifier_with(
            r#"{"is_correct": false, "confidence": 0.4,
                "issues": ["sign error in step 2"], "needs_human_review": true}"#,
        );
        let verdict = verifier.verify("Solve x + 1 = 2", "x = -1");
        assert!(!verdict.is_correct);
        assert!((verdict.confidence - 0.4).abs() < f32::EPSILON);
        assert_eq!(verdict.issues, vec!["sign error in step 2"]);
        assert!(verdict.needs_human_review);
        assert_eq!(counters.count(FallbackKind::Verifier), 0);
    }

    #[test]
    fn test_decodes_fenced_verdict() {
        let (verifier, _) = verifier_with(
            "```json\n{\"is_correct\": true, \"confidence\": 0.95}\n```",
        );
        let verdict = verifier.verify("p", "s");
        assert!(verdict.is_correct);
        assert!((verdict.confidence - 0.95).abs() < f32::EPSILON);
        assert!(verdict.issues.is_empty());
    }

    #[test]
    fn test_undecodable_reply_is_optimistic() {
        let (verifier, counters) = verifier_with("Looks good to me!");
        let verdict = verifier.verify("p", "s");
        assert_eq!(verdict, VerificationResult::optimistic_default());
        assert_eq!(counters.count(FallbackKind::Verifier), 1);
    }

    #[test]
    fn test_generation_failure_is_optimistic() {
        let counters = Arc::new(FallbackCounters::new());
        let verifier = Verifier::new(Arc::new(FailingGenerator), Arc::clone(&counters));
        let verdict = verifier.verify("p", "s");
        assert_eq!(verdict, VerificationResult::optimistic_default());
        assert_eq!(counters.count(FallbackKind::Verifier), 1);
    }
}
