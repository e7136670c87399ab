//! Problem parsing stage: free-form input to a structured [`ParsedProblem`].

use std::sync::Arc;

use serde::Deserialize;

use crate::llm::{self, TextGenerator};
use crate::models::{ParsedProblem, Topic};
use crate::observability::{FallbackCounters, FallbackKind};

const SYSTEM_PROMPT: &str = r#"You are a math problem parser. Your job is to:
1. Clean and structure the input problem
2. Identify the math topic (algebra, calculus, probability, linear_algebra)
3. Extract variables and constraints
4. Detect if clarification is needed

Return ONLY a valid JSON object with this exact structure:
{
  "problem_text": "cleaned problem statement",
  "topic": "algebra",
  "variables": ["x", "y"],
  "constraints": ["x > 0"],
  "needs_clarification": false,
  "clarification_reason": ""
}

Topic must be one of: algebra, calculus, probability, linear_algebra"#;

const TEMPERATURE: f32 = 0.0;

/// Lenient decode target: every field is defaulted so a partially valid
/// response still contributes what it has.
#[derive(Debug, Deserialize)]
struct ParserPayload {
    #[serde(default)]
    problem_text: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    variables: Vec<String>,
    #[serde(default)]
    constraints: Vec<String>,
    #[serde(default)]
    needs_clarification: bool,
    #[serde(default)]
    clarification_reason: String,
}

/// Turns raw problem text into a [`ParsedProblem`] using the configured
/// text generator.
pub struct ProblemParser {
    generator: Arc<dyn TextGenerator>,
    counters: Arc<FallbackCounters>,
}

impl ProblemParser {
    /// Creates a parser over the given generator.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, counters: Arc<FallbackCounters>) -> Self {
        Self {
            generator,
            counters,
        }
    }

    /// Parses raw input into a structured problem.
    ///
    /// Infallible at this boundary: any generation or decode failure falls
    /// back to [`ParsedProblem::fallback`], which carries the raw input
    /// through under the default topic.
    #[must_use]
    pub fn parse(&self, raw_input: &str) -> ParsedProblem {
        let user = format!("Parse this math problem: {raw_input}");

        let response = match self.generator.generate(SYSTEM_PROMPT, &user, TEMPERATURE) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Problem parsing failed; using raw input");
                self.counters.record(FallbackKind::Parser);
                return ParsedProblem::fallback(raw_input);
            },
        };

        match serde_json::from_str::<ParserPayload>(llm::extract_json(&response)) {
            Ok(payload) => repair(payload, raw_input),
            Err(e) => {
                tracing::warn!(error = %e, "Parser response was not valid JSON; using raw input");
                self.counters.record(FallbackKind::Parser);
                ParsedProblem::fallback(raw_input)
            },
        }
    }
}

/// Fills the holes a partially valid payload may leave.
fn repair(payload: ParserPayload, raw_input: &str) -> ParsedProblem {
    let problem_text = if payload.problem_text.trim().is_empty() {
        raw_input.to_string()
    } else {
        payload.problem_text
    };
    ParsedProblem {
        problem_text,
        topic: Topic::parse(&payload.topic),
        variables: payload.variables,
        constraints: payload.constraints,
        needs_clarification: payload.needs_clarification,
        clarification_reason: payload.clarification_reason,
    }
}
