//! Interaction records persisted to the memory store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ParsedProblem, VerificationResult};

/// Channel an interaction arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Typed text, the default channel.
    #[default]
    Text,
    /// Text recovered from an image by OCR.
    Image,
    /// Text transcribed from speech.
    Audio,
}

impl InputType {
    /// Canonical lowercase label, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InputType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown input type '{other}', expected text, image, or audio"
            ))),
        }
    }
}

/// User feedback on a delivered solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    /// No feedback given. Records start here.
    #[default]
    None,
    /// User marked the solution correct.
    Correct,
    /// User marked the solution incorrect.
    Incorrect,
}

impl Feedback {
    /// Canonical lowercase label, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Feedback {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "correct" => Ok(Self::Correct),
            "incorrect" => Ok(Self::Incorrect),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown feedback '{other}', expected none, correct, or incorrect"
            ))),
        }
    }
}

/// A completed interaction as persisted by the memory store.
///
/// Identity and timestamp are assigned by the store at insertion time, never
/// by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Store-assigned unique id.
    pub id: Uuid,
    /// Store-assigned creation time, UTC.
    pub timestamp: DateTime<Utc>,
    /// Raw input exactly as it entered the pipeline.
    pub original_input: String,
    /// Channel the input arrived through.
    pub input_type: InputType,
    /// Structured problem from the parsing stage.
    pub parsed_problem: ParsedProblem,
    /// Narrative solution shown to the user.
    pub solution: String,
    /// Verifier verdict for the solution.
    pub verification: VerificationResult,
    /// User feedback, `None` until the user weighs in.
    #[serde(default)]
    pub feedback: Feedback,
    /// Free-form comment accompanying the feedback, empty when absent.
    #[serde(default)]
    pub user_comment: String,
}

/// Interaction content prepared by the pipeline, before the store assigns
/// id and timestamp.
#[derive(Debug, Clone)]
pub struct InteractionDraft {
    /// Raw input exactly as it entered the pipeline.
    pub original_input: String,
    /// Channel the input arrived through.
    pub input_type: InputType,
    /// Structured problem from the parsing stage.
    pub parsed_problem: ParsedProblem,
    /// Narrative solution shown to the user.
    pub solution: String,
    /// Verifier verdict for the solution.
    pub verification: VerificationResult,
    /// User feedback known at store time.
    pub feedback: Feedback,
    /// Free-form comment accompanying the feedback.
    pub user_comment: String,
}
