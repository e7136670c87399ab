//! Input intake contracts.
//!
//! Media conversion itself (OCR, speech transcription) happens upstream;
//! this module holds the pieces of that handoff the pipeline owns: the
//! spoken-math normalization applied to transcripts before parsing, and the
//! confidence threshold below which extracted text should be reviewed by a
//! person instead of trusted.

/// Phrase-to-symbol substitutions for transcribed speech, applied in order.
const SPOKEN_MATH: [(&str, &str); 8] = [
    ("squared", "^2"),
    ("cubed", "^3"),
    ("square root of", "sqrt("),
    ("plus", "+"),
    ("minus", "-"),
    ("times", "*"),
    ("divided by", "/"),
    ("equals", "="),
];

/// Extraction confidence below this needs a human look before solving.
pub const REVIEW_THRESHOLD: f32 = 0.7;

/// Rewrites spoken math phrases as symbols.
///
/// Speech transcripts say "x squared plus three equals seven"; the parser
/// wants `x ^2 + three = seven`. Substitution is plain and positional, the
/// parsing stage absorbs the leftover prose.
#[must_use]
pub fn normalize_spoken_math(text: &str) -> String {
    let mut normalized = text.to_string();
    for (phrase, symbol) in SPOKEN_MATH {
        normalized = normalized.replace(phrase, symbol);
    }
    normalized
}

/// True when extracted text arrived with too little confidence to trust.
#[must_use]
pub fn needs_review(confidence: f32) -> bool {
    confidence < REVIEW_THRESHOLD
}
