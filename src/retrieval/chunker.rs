//! Recursive character chunking.
//!
//! Splits reference documents into retrieval-sized chunks. Splitting prefers
//! paragraph boundaries, then line boundaries, then spaces, and only cuts
//! mid-word when a single token exceeds the chunk size. Adjacent pieces are
//! merged back up to the chunk size, carrying a tail overlap across chunk
//! boundaries so context is not lost at the seams.
//!
//! Every produced chunk is a verbatim substring of the (trimmed) input.

use crate::config::RetrievalConfig;
use super::corpus::Document;

/// Split preference, coarsest boundary first.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Chunking parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap carried between adjacent chunks, in characters.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl From<RetrievalConfig> for ChunkingConfig {
    fn from(config: RetrievalConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

/// A chunk of a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Name of the document the chunk came from.
    pub source: String,
    /// Chunk text.
    pub text: String,
}

/// A piece boundary within the input text, in byte offsets.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
}

/// Splits one document into chunks, tagging each with the document name.
#[must_use]
pub fn split_document(document: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    split_text(&document.content, config)
        .into_iter()
        .map(|text| Chunk {
            source: document.name.clone(),
            text,
        })
        .collect()
}

/// Splits text into chunks of at most `chunk_size` characters.
#[must_use]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.len() <= config.chunk_size {
        return vec![trimmed.to_string()];
    }

    // A degenerate overlap would stall the merge loop below.
    let overlap = config.overlap.min(config.chunk_size.saturating_sub(1));

    let mut pieces = Vec::new();
    decompose(trimmed, 0, config.chunk_size, 0, &mut pieces);
    merge_pieces(trimmed, &pieces, config.chunk_size, overlap)
}

/// Recursively splits oversized text at progressively finer separators.
fn decompose(text: &str, offset: usize, max_len: usize, level: usize, out: &mut Vec<Piece>) {
    if text.len() <= max_len {
        if !text.trim().is_empty() {
            out.push(Piece {
                start: offset,
                end: offset + text.len(),
            });
        }
        return;
    }
    if level >= SEPARATORS.len() {
        hard_cut(text, offset, max_len, out);
        return;
    }

    let separator = SEPARATORS[level];
    let mut cursor = 0;
    for (pos, matched) in text.match_indices(separator) {
        if pos > cursor {
            decompose(&text[cursor..pos], offset + cursor, max_len, level + 1, out);
        }
        cursor = pos + matched.len();
    }
    if cursor < text.len() {
        decompose(&text[cursor..], offset + cursor, max_len, level + 1, out);
    }
}

/// Cuts text on character boundaries when no separator fits.
fn hard_cut(text: &str, offset: usize, max_len: usize, out: &mut Vec<Piece>) {
    let mut start = 0;
    let mut len = 0;
    for (idx, ch) in text.char_indices() {
        if len + ch.len_utf8() > max_len && len > 0 {
            out.push(Piece {
                start: offset + start,
                end: offset + idx,
            });
            start = idx;
            len = 0;
        }
        len += ch.len_utf8();
    }
    if len > 0 {
        out.push(Piece {
            start: offset + start,
            end: offset + text.len(),
        });
    }
}

/// Greedily merges pieces up to `chunk_size`, carrying an overlap tail.
fn merge_pieces(text: &str, pieces: &[Piece], chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    if pieces.is_empty() {
        return chunks;
    }

    let mut start = 0usize;
    let mut end = 0usize;
    while end < pieces.len() {
        let candidate_len = pieces[end].end - pieces[start].start;
        if candidate_len > chunk_size && end > start {
            let chunk_end = pieces[end - 1].end;
            chunks.push(text[pieces[start].start..chunk_end].to_string());

            // Walk back to the earliest piece still within `overlap`
            // characters of the chunk that just closed.
            let mut new_start = end;
            for j in (start..end).rev() {
                if chunk_end - pieces[j].start <= overlap {
                    new_start = j;
                } else {
                    break;
                }
            }
            if new_start == start {
                new_start = start + 1;
            }
            start = new_start;
        } else {
            end += 1;
        }
    }

    if start < pieces.len() {
        let last = pieces[pieces.len() - 1].end;
        chunks.push(text[pieces[start].start..last].to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            overlap,
        }
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(split_text("", &ChunkingConfig::default()).is_empty());
        assert!(split_text("   \n\n  ", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_short_input_is_single_chunk() {
        let chunks = split_text("The quadratic formula.", &ChunkingConfig::default());
        assert_eq!(chunks, vec!["The quadratic formula.".to_string()]);
    }

    #[test]
    fn test_chunks_respect_max_size() {
        let text = "alpha beta gamma delta epsilon zeta eta theta ".repeat(40);
        let cfg = config(100, 20);
        let chunks = split_text(&text, &cfg);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.len() <= cfg.chunk_size,
                "chunk of {} chars exceeds limit {}",
                chunk.len(),
                cfg.chunk_size
            );
        }
    }

    #[test]
    fn test_chunks_are_substrings_of_input() {
        let text = "First paragraph about matrices.\n\nSecond paragraph about \
                    determinants and inverses.\n\nThird paragraph about eigenvalues \
                    and eigenvectors with a longer tail of descriptive text."
            .repeat(5);
        let chunks = split_text(&text, &config(120, 30));

        let trimmed = text.trim();
        for chunk in &chunks {
            assert!(trimmed.contains(chunk.as_str()), "chunk not verbatim: {chunk}");
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(80));
        let chunks = split_text(&text, &config(100, 0));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(80));
        assert_eq!(chunks[1], "b".repeat(80));
    }

    #[test]
    fn test_overlap_carries_across_chunks() {
        // Pieces of 8 chars so the 20-char overlap spans whole pieces.
        let text = (0..40)
            .map(|i| format!("word{i:04}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = split_text(&text, &config(60, 20));

        // Longest suffix of `a` that is also a prefix of `b`.
        fn shared_overlap(a: &str, b: &str) -> usize {
            (1..=a.len().min(b.len()))
                .rev()
                .find(|&k| a.ends_with(&b[..k]))
                .unwrap_or(0)
        }

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let shared = shared_overlap(&pair[0], &pair[1]);
            assert!(
                shared >= 8,
                "chunks '{}' and '{}' share only {} chars",
                pair[0],
                pair[1],
                shared
            );
            assert!(shared <= 20, "overlap exceeded configured size: {shared}");
        }
    }

    #[test]
    fn test_hard_cut_on_unbroken_text() {
        let text = "x".repeat(1200);
        let chunks = split_text(&text, &config(500, 50));

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.len() <= 500);
        }
        let total: usize = chunks.iter().map(String::len).sum();
        assert!(total >= 1200, "hard cut must not lose text");
    }

    #[test]
    fn test_hard_cut_respects_char_boundaries() {
        let text = "é".repeat(600);
        let chunks = split_text(&text, &config(101, 0));
        for chunk in &chunks {
            assert!(chunk.len() <= 101);
            assert!(chunk.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn test_split_document_tags_source() {
        let doc = Document {
            name: "algebra_formulas.txt".to_string(),
            content: "a ".repeat(600),
        };
        let chunks = split_document(&doc, &config(100, 10));
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert_eq!(chunk.source, "algebra_formulas.txt");
        }
    }

    #[test]
    fn test_config_from_retrieval() {
        let retrieval = RetrievalConfig {
            chunk_size: 750,
            chunk_overlap: 75,
            top_k: 5,
        };
        let cfg = ChunkingConfig::from(retrieval);
        assert_eq!(cfg.chunk_size, 750);
        assert_eq!(cfg.overlap, 75);
    }
}
