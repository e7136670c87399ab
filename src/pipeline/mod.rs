//! Pipeline orchestration.
//!
//! [`Pipeline`] is the explicit context object for one tutoring session: it
//! owns the stages, the knowledge index, the memory store, and the fallback
//! counters. There are no globals; two pipelines over different data
//! directories are fully independent.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::MentorConfig;
use crate::embedding::{self, Embedder};
use crate::intake;
use crate::llm::{self, TextGenerator};
use crate::memory::{MemoryStore, RecallHit};
use crate::models::{
    Feedback, InputType, InteractionDraft, ParsedProblem, SolutionBundle, VerificationResult,
};
use crate::observability::{FallbackCounters, FallbackKind, FallbackSnapshot};
use crate::retrieval::KnowledgeIndex;
use crate::stages::{Explainer, ProblemParser, ReasoningSolver, Verifier};
use crate::{Error, Result};

/// Everything one interaction produced, in stage order.
#[derive(Debug, Clone)]
pub struct InteractionOutcome {
    /// Structured problem from the parsing stage.
    pub parsed: ParsedProblem,
    /// Similar past interactions, most similar first.
    pub similar: Vec<RecallHit>,
    /// Narrative solution, symbolic result, and retrieved context.
    pub bundle: SolutionBundle,
    /// Verifier verdict on the narrative solution.
    pub verification: VerificationResult,
    /// Student-facing explanation, or an explicit unavailability notice.
    pub explanation: String,
}

/// The full parse, solve, verify, explain pipeline.
pub struct Pipeline {
    config: MentorConfig,
    parser: ProblemParser,
    solver: ReasoningSolver,
    verifier: Verifier,
    explainer: Explainer,
    memory: MemoryStore,
    counters: Arc<FallbackCounters>,
}

impl Pipeline {
    /// Builds a pipeline from configuration, using the configured LLM
    /// provider and the default embedder.
    ///
    /// # Errors
    ///
    /// Returns an error if the knowledge index cannot be loaded or built.
    pub fn new(config: MentorConfig) -> Result<Self> {
        let generator = llm::build_generator(&config.llm);
        let embedder = embedding::build_embedder();
        Self::with_components(config, generator, embedder)
    }

    /// Builds a pipeline with injected generator and embedder.
    ///
    /// This is the seam tests use to run the full pipeline against mock
    /// providers.
    ///
    /// # Errors
    ///
    /// Returns an error if the knowledge index cannot be loaded or built.
    pub fn with_components(
        config: MentorConfig,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let index = Arc::new(KnowledgeIndex::load(
            &config.corpus_dir,
            &config.index_path(),
            &config.retrieval,
            embedder,
        )?);
        let memory = MemoryStore::open(config.memory_path(), config.recall.similarity_threshold);
        let counters = Arc::new(FallbackCounters::new());

        let parser = ProblemParser::new(Arc::clone(&generator), Arc::clone(&counters));
        let solver = ReasoningSolver::new(
            Arc::clone(&generator),
            index,
            config.retrieval.top_k,
            Arc::clone(&counters),
        );
        let verifier = Verifier::new(Arc::clone(&generator), Arc::clone(&counters));
        let explainer = Explainer::new(generator);

        Ok(Self {
            config,
            parser,
            solver,
            verifier,
            explainer,
            memory,
            counters,
        })
    }

    /// Runs one interaction end to end.
    ///
    /// Stage failures degrade inside their stages; this returns `Err` only
    /// for empty input. An explainer failure becomes an explicit
    /// `Explanation unavailable` notice rather than losing the rest of the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `raw_input` is empty or
    /// whitespace.
    pub fn run(&self, raw_input: &str, input_type: InputType) -> Result<InteractionOutcome> {
        let trimmed = raw_input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("problem text is empty".to_string()));
        }

        let text = match input_type {
            InputType::Audio => intake::normalize_spoken_math(trimmed),
            InputType::Text | InputType::Image => trimmed.to_string(),
        };

        tracing::info!(%input_type, "Starting interaction");

        let parsed = self.parser.parse(&text);
        if parsed.needs_clarification {
            tracing::info!(
                reason = %parsed.clarification_reason,
                "Problem needs clarification; continuing with best effort"
            );
        }

        let similar = self
            .memory
            .recall(&parsed.problem_text, self.config.recall.limit);
        let bundle = self.solver.solve(&parsed);
        let verification = self
            .verifier
            .verify(&parsed.problem_text, &bundle.narrative);

        let explanation = match self
            .explainer
            .explain(&parsed.problem_text, &bundle.narrative)
        {
            Ok(explanation) => explanation,
            Err(e) => {
                tracing::warn!(error = %e, "Explanation failed; shipping a notice");
                self.counters.record(FallbackKind::Explainer);
                format!("Explanation unavailable: {e}")
            },
        };

        tracing::info!(
            topic = %parsed.topic,
            verified = verification.is_correct,
            similar = similar.len(),
            "Interaction complete"
        );

        Ok(InteractionOutcome {
            parsed,
            similar,
            bundle,
            verification,
            explanation,
        })
    }

    /// Persists a completed interaction to the memory store.
    ///
    /// Call once per outcome; the store assigns the id and timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory log cannot be written.
    pub fn record(
        &mut self,
        raw_input: &str,
        input_type: InputType,
        outcome: &InteractionOutcome,
        feedback: Feedback,
        comment: &str,
    ) -> Result<Uuid> {
        self.memory.store(InteractionDraft {
            original_input: raw_input.to_string(),
            input_type,
            parsed_problem: outcome.parsed.clone(),
            solution: outcome.bundle.narrative.clone(),
            verification: outcome.verification.clone(),
            feedback,
            user_comment: comment.to_string(),
        })
    }

    /// Current fallback tallies for this pipeline.
    #[must_use]
    pub fn fallback_snapshot(&self) -> FallbackSnapshot {
        self.counters.snapshot()
    }

    /// Number of interactions in the memory store.
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }
}
