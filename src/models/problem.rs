//! Parsed problem records produced by the parsing stage.

use serde::{Deserialize, Serialize};

/// Topic a problem is classified under.
///
/// The classifier may emit anything; unknown labels collapse onto
/// [`Topic::Algebra`] via [`Topic::parse`] so that downstream retrieval
/// always has a usable namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Equations, polynomials, and algebraic manipulation.
    #[default]
    Algebra,
    /// Limits, derivatives, and integrals.
    Calculus,
    /// Probability, counting, and distributions.
    Probability,
    /// Vectors, matrices, and linear systems.
    LinearAlgebra,
}

impl Topic {
    /// All supported topics, in display order.
    pub const ALL: [Self; 4] = [
        Self::Algebra,
        Self::Calculus,
        Self::Probability,
        Self::LinearAlgebra,
    ];

    /// Canonical lowercase label, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Algebra => "algebra",
            Self::Calculus => "calculus",
            Self::Probability => "probability",
            Self::LinearAlgebra => "linear_algebra",
        }
    }

    /// Parses a topic label leniently.
    ///
    /// Matching is case-insensitive and tolerates the space and hyphen
    /// spellings of `linear_algebra`. Anything unrecognized becomes
    /// [`Topic::Algebra`].
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "calculus" => Self::Calculus,
            "probability" => Self::Probability,
            "linear_algebra" | "linear algebra" | "linear-algebra" => Self::LinearAlgebra,
            _ => Self::Algebra,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured form of a user's problem, as extracted by the parsing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedProblem {
    /// Cleaned statement of the problem.
    pub problem_text: String,
    /// Topic used to steer retrieval.
    pub topic: Topic,
    /// Variable names mentioned in the problem, deduplicated in first-seen
    /// order.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Constraints stated alongside the problem, verbatim.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// True when the problem is too ambiguous to solve as stated.
    #[serde(default)]
    pub needs_clarification: bool,
    /// Human-readable reason when `needs_clarification` is set, empty
    /// otherwise.
    #[serde(default)]
    pub clarification_reason: String,
}

impl ParsedProblem {
    /// Fallback record used when the parsing stage cannot produce a
    /// structured result.
    ///
    /// Carries the raw input through unchanged so the rest of the
    /// pipeline still runs.
    #[must_use]
    pub fn fallback(raw_input: &str) -> Self {
        Self {
            problem_text: raw_input.to_string(),
            topic: Topic::Algebra,
            variables: Vec::new(),
            constraints: Vec::new(),
            needs_clarification: false,
            clarification_reason: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_parse_known_labels() {
        assert_eq!(Topic::parse("algebra"), Topic::Algebra);
        assert_eq!(Topic::parse("Calculus"), Topic::Calculus);
        assert_eq!(Topic::parse("PROBABILITY"), Topic::Probability);
        assert_eq!(Topic::parse("linear_algebra"), Topic::LinearAlgebra);
        assert_eq!(Topic::parse("linear algebra"), Topic::LinearAlgebra);
        assert_eq!(Topic::parse("Linear-Algebra"), Topic::LinearAlgebra);
    }

    #[test]
    fn test_topic_parse_unknown_defaults_to_algebra() {
        assert_eq!(Topic::parse("statistics"), Topic::Algebra);
        assert_eq!(Topic::parse(""), Topic::Algebra);
        assert_eq!(Topic::parse("  geometry  "), Topic::Algebra);
    }

    #[test]
    fn test_topic_serde_round_trip() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(json, format!("\"{topic}\""));
            let back: Topic = serde_json::from_str(&json).unwrap();
            assert_eq!(back, topic);
        }
    }

    #[test]
    fn test_fallback_preserves_raw_input() {
        let parsed = ParsedProblem::fallback("solve 2x+3=7");
        assert_eq!(parsed.problem_text, "solve 2x+3=7");
        assert_eq!(parsed.topic, Topic::Algebra);
        assert!(!parsed.needs_clarification);
        assert!(parsed.clarification_reason.is_empty());
        assert!(parsed.variables.is_empty());
    }

    #[test]
    fn test_parsed_problem_missing_optional_fields_deserialize() {
        let json = r#"{"problem_text": "x = 1", "topic": "algebra"}"#;
        let parsed: ParsedProblem = serde_json::from_str(json).unwrap();
        assert!(parsed.variables.is_empty());
        assert!(!parsed.needs_clarification);
        assert!(parsed.clarification_reason.is_empty());
    }
}
