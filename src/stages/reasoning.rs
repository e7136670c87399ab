//! Reasoning stage: retrieval-grounded narrative solving plus an exact
//! symbolic attempt.

use std::sync::Arc;

use crate::llm::TextGenerator;
use crate::models::{ParsedProblem, SolutionBundle, SymbolicResult};
use crate::observability::{FallbackCounters, FallbackKind};
use crate::retrieval::KnowledgeIndex;
use crate::solver;

const TEMPERATURE: f32 = 0.0;

/// Context string used when retrieval returns nothing. The generator is
/// told so explicitly instead of being handed an empty block.
const NO_CONTEXT: &str = "No relevant context found.";

/// Produces a [`SolutionBundle`] for a parsed problem.
///
/// Three things happen per problem: passages are retrieved from the
/// knowledge index, the exact symbolic solver takes its shot, and the
/// generator writes the step-by-step narrative grounded in the retrieved
/// context.
pub struct ReasoningSolver {
    generator: Arc<dyn TextGenerator>,
    index: Arc<KnowledgeIndex>,
    top_k: usize,
    counters: Arc<FallbackCounters>,
}

impl ReasoningSolver {
    /// Creates a solver over the given generator and index. `top_k` is the
    /// number of passages requested per problem.
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        index: Arc<KnowledgeIndex>,
        top_k: usize,
        counters: Arc<FallbackCounters>,
    ) -> Self {
        Self {
            generator,
            index,
            top_k,
            counters,
        }
    }

    /// Solves a parsed problem.
    ///
    /// Never fails: a generation error ships as the narrative text with
    /// confidence zero, and an empty retrieval is replaced by an explicit
    /// no-context marker. Both paths are logged and counted.
    #[must_use]
    pub fn solve(&self, parsed: &ParsedProblem) -> SolutionBundle {
        let query = format!("{} {}", parsed.topic, parsed.problem_text);
        let retrieved = self.index.retrieve(&query, self.top_k);

        let context = if retrieved.is_empty() {
            tracing::warn!(query = %query, "No passages retrieved; solving without context");
            self.counters.record(FallbackKind::Retrieval);
            NO_CONTEXT.to_string()
        } else {
            retrieved
                .iter()
                .map(|passage| passage.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let symbolic = solver::try_solve(&parsed.problem_text);

        let system = system_prompt(&context);
        let user = format!("Problem: {}\nTopic: {}", parsed.problem_text, parsed.topic);

        let (narrative, confidence) = match self.generator.generate(&system, &user, TEMPERATURE) {
            Ok(narrative) => (narrative, 0.85),
            Err(e) => {
                tracing::warn!(error = %e, "Narrative generation failed; shipping error text");
                self.counters.record(FallbackKind::Generation);
                (format!("Error: {e}"), 0.0)
            },
        };

        SolutionBundle {
            narrative,
            symbolic,
            retrieved,
            confidence,
        }
    }
}

fn system_prompt(context: &str) -> String {
    format!(
        "You are an expert math solver. Use the provided context and solve step-by-step.\n\
         \n\
         Context from knowledge base:\n\
         {context}\n\
         \n\
         Provide:\n\
         1. Solution approach\n\
         2. Step-by-step solution\n\
         3. Final answer\n\
         4. Verification code if applicable"
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Result;
    use crate::config::RetrievalConfig;
    use crate::embedding::HashEmbedder;
    use crate::models::Topic;
    use crate::retrieval;

    struct RecordingGenerator {
        seen: Mutex<Vec<(String, String)>>,
        reply: String,
    }

    impl RecordingGenerator {
        fn new(reply: &str) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                reply: reply.to_string(),
            }
        }

        fn prompts(&self) -> Vec<(String, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl TextGenerator for RecordingGenerator {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn generate(&self, system: &str, user: &str, _temperature: f32) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(self.reply.clone())
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

    fn built_index(dir: &std::path::Path) -> Arc<KnowledgeIndex> {
        std::fs::create_dir_all(dir.join("corpus")).unwrap();
        std::fs::write(
            dir.join("corpus/algebra.txt"),
            "Quadratic Formula: For a*x^2 + b*x + c = 0, x = (-b +- sqrt(b^2 - 4ac)) / 2a",
        )
        .unwrap();
        let index = KnowledgeIndex::build(
            &dir.join("corpus"),
            &dir.join("index.json"),
            &RetrievalConfig::default(),
            Arc::new(HashEmbedder::default()),
        )
        .unwrap();
        Arc::new(index)
    }

    /// Index over a corpus whose only document is blank, so it holds zero
    /// chunks and every retrieval comes back empty.
    fn empty_index(dir: &std::path::Path) -> Arc<KnowledgeIndex> {
        std::fs::create_dir_all(dir.join("corpus")).unwrap();
        std::fs::write(dir.join("corpus/blank.txt"), "   \n  \n").unwrap();
        let index = KnowledgeIndex::build(
            &dir.join("corpus"),
            &dir.join("index.json"),
            &RetrievalConfig::default(),
            Arc::new(HashEmbedder::default()),
        )
        .unwrap();
        Arc::new(index)
    }

    fn problem(text: &str) -> ParsedProblem {
        ParsedProblem {
            problem_text: text.to_string(),
            topic: Topic::Algebra,
            variables: vec!["x".to_string()],
            constraints: Vec::new(),
            needs_clarification: false,
            clarification_reason: String::new(),
        }
    }

    #[test]
    fn test_solve_grounds_prompt_in_retrieved_context() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(RecordingGenerator::new("The answer is x = 2."));
        let counters = Arc::new(FallbackCounters::new());
        let solver = ReasoningSolver::new(
            Arc::clone(&generator) as Arc<dyn TextGenerator>,
            built_index(dir.path()),
            3,
            Arc::clone(&counters),
        );

        let bundle = solver.solve(&problem("Solve x^2 = 4"));

        assert_eq!(bundle.narrative, "The answer is x = 2.");
        assert!((bundle.confidence - 0.85).abs() < f32::EPSILON);
        assert!(!bundle.retrieved.is_empty());

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("Quadratic Formula"));
        assert!(prompts[0].1.contains("Problem: Solve x^2 = 4"));
        assert!(prompts[0].1.contains("Topic: algebra"));
        assert_eq!(counters.snapshot().total(), 0);
    }

    #[test]
    fn test_solve_runs_symbolic_solver() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ReasoningSolver::new(
            Arc::new(RecordingGenerator::new("narrative")),
            built_index(dir.path()),
            3,
            Arc::new(FallbackCounters::new()),
        );

        let bundle = solver.solve(&problem("x^2 = 4"));
        match bundle.symbolic {
            SymbolicResult::Solved { solutions, .. } => {
                assert_eq!(solutions, vec!["-2".to_string(), "2".to_string()]);
            },
            other => panic!("expected Solved, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_retrieval_uses_placeholder_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(RecordingGenerator::new("narrative"));
        let counters = Arc::new(FallbackCounters::new());
        let solver = ReasoningSolver::new(
            Arc::clone(&generator) as Arc<dyn TextGenerator>,
            empty_index(dir.path()),
            3,
            Arc::clone(&counters),
        );

        let bundle = solver.solve(&problem("Solve x + 1 = 2"));

        assert!(bundle.retrieved.is_empty());
        assert_eq!(counters.count(FallbackKind::Retrieval), 1);
        let prompts = generator.prompts();
        assert!(prompts[0].0.contains("No relevant context found."));
    }

    #[test]
    fn test_generation_failure_ships_error_narrative() {
        let dir = tempfile::tempdir().unwrap();
        let counters = Arc::new(FallbackCounters::new());
        let solver = ReasoningSolver::new(
            Arc::new(FailingGenerator),
            built_index(dir.path()),
            3,
            Arc::clone(&counters),
        );

        let bundle = solver.solve(&problem("Solve x + 1 = 2"));

        assert!(bundle.narrative.starts_with("Error: "));
        assert!(bundle.narrative.contains("provider offline"));
        assert!(bundle.confidence.abs() < f32::EPSILON);
        assert_eq!(counters.count(FallbackKind::Generation), 1);
        // Symbolic result still computed on this path.
        assert!(bundle.symbolic.is_solved());
    }
}
