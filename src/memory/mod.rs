//! Durable interaction memory with similarity-based recall.
//!
//! The store is a single JSON file holding every completed interaction. It
//! is loaded whole at construction and rewritten whole on every mutation.
//! At tutoring scale the file stays small and whole-file writes keep the
//! on-disk state trivially inspectable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::models::{InteractionDraft, InteractionRecord};
use crate::{Error, Result};

/// A past interaction surfaced by recall, paired with its score.
#[derive(Debug, Clone)]
pub struct RecallHit {
    /// The stored interaction.
    pub record: InteractionRecord,
    /// Jaccard similarity between the query and the record's problem text,
    /// in `[0.0, 1.0]`.
    pub similarity: f32,
}

/// Append-only log of completed interactions.
///
/// Mutation goes through `&mut self`; the store is owned by one pipeline
/// and never shared across writers.
#[derive(Debug)]
pub struct MemoryStore {
    path: PathBuf,
    records: Vec<InteractionRecord>,
    similarity_threshold: f32,
}

impl MemoryStore {
    /// Opens the store at `path`, loading any existing history.
    ///
    /// A missing file means an empty history. A file that cannot be read or
    /// decoded also yields an empty history, with a warning; the damaged
    /// file stays untouched on disk until the next successful write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, similarity_threshold: f32) -> Self {
        let path = path.into();
        let records = load_records(&path);
        Self {
            path,
            records,
            similarity_threshold,
        }
    }

    /// Appends a completed interaction and persists the whole log.
    ///
    /// The store assigns the id and timestamp; callers never pick either.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written. The in-memory state
    /// is rolled back so the store never drifts from disk.
    pub fn store(&mut self, draft: InteractionDraft) -> Result<Uuid> {
        let record = InteractionRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            original_input: draft.original_input,
            input_type: draft.input_type,
            parsed_problem: draft.parsed_problem,
            solution: draft.solution,
            verification: draft.verification,
            feedback: draft.feedback,
            user_comment: draft.user_comment,
        };
        let id = record.id;

        self.records.push(record);
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }

        tracing::info!(interaction_id = %id, total = self.records.len(), "Interaction stored");
        Ok(id)
    }

    /// Finds past interactions whose problem text resembles `problem_text`.
    ///
    /// Scores by Jaccard similarity over lowercased whitespace tokens and
    /// keeps hits strictly above the similarity threshold, most similar
    /// first. Ties keep insertion order, so of two equally similar records
    /// the older one ranks first.
    #[must_use]
    pub fn recall(&self, problem_text: &str, limit: usize) -> Vec<RecallHit> {
        let mut hits: Vec<RecallHit> = self
            .records
            .iter()
            .filter_map(|record| {
                let similarity = text_similarity(problem_text, &record.parsed_problem.problem_text);
                (similarity > self.similarity_threshold).then(|| RecallHit {
                    record: record.clone(),
                    similarity,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        hits
    }

    /// Applies feedback to a stored interaction and persists the change.
    ///
    /// # Errors
    ///
    /// Returns an error if no record has the given id or the log cannot be
    /// written.
    pub fn apply_feedback(
        &mut self,
        id: Uuid,
        feedback: crate::models::Feedback,
        comment: &str,
    ) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| Error::InvalidInput(format!("no interaction with id {id}")))?;

        record.feedback = feedback;
        record.user_comment = comment.to_string();
        self.persist()
    }

    /// Removes every stored interaction and persists the empty log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written; the history is kept
    /// in that case.
    pub fn clear(&mut self) -> Result<()> {
        let drained = std::mem::take(&mut self.records);
        if let Err(e) = self.persist() {
            self.records = drained;
            return Err(e);
        }
        tracing::info!(removed = drained.len(), "Memory cleared");
        Ok(())
    }

    /// Number of stored interactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no interactions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All stored interactions, oldest first.
    #[must_use]
    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_memory_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        // Pretty output; the log is meant to be readable as a file.
        let encoded =
            serde_json::to_string_pretty(&self.records).map_err(|e| Error::OperationFailed {
                operation: "encode_memory".to_string(),
                cause: e.to_string(),
            })?;

        std::fs::write(&self.path, encoded).map_err(|e| Error::OperationFailed {
            operation: "write_memory".to_string(),
            cause: e.to_string(),
        })
    }
}

fn load_records(path: &Path) -> Vec<InteractionRecord> {
    if !path.exists() {
        return Vec::new();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read memory log; starting empty");
            return Vec::new();
        },
    };

    match serde_json::from_str(&contents) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Memory log is corrupt; starting empty");
            Vec::new()
        },
    }
}

/// Jaccard index over lowercased whitespace token sets, in `[0.0, 1.0]`.
///
/// This is the score [`MemoryStore::recall`] ranks by. Either side
/// tokenizing to nothing scores 0.0, so blank queries match nothing rather
/// than everything.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn text_similarity(a: &str, b: &str) -> f32 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();

    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feedback, InputType, ParsedProblem, Topic, VerificationResult};

    fn draft(problem_text: &str) -> InteractionDraft {
        InteractionDraft {
            original_input: problem_text.to_string(),
            input_type: InputType::Text,
            parsed_problem: ParsedProblem {
                problem_text: problem_text.to_string(),
                topic: Topic::Algebra,
                variables: Vec::new(),
                constraints: Vec::new(),
                needs_clarification: false,
                clarification_reason: String::new(),
            },
            solution: "solution".to_string(),
            verification: VerificationResult::optimistic_default(),
            feedback: Feedback::None,
            user_comment: String::new(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> MemoryStore {
        MemoryStore::open(dir.path().join("memory.json"), 0.3)
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_assigns_unique_ids_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        let first = store.store(draft("Solve x + 1 = 2")).unwrap();
        let second = store.store(draft("Solve x + 2 = 3")).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);

        // A fresh store over the same file sees both records.
        let reopened = store_in(&dir);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.records()[0].id, first);
        assert_eq!(reopened.records()[1].id, second);
    }

    #[test]
    fn test_open_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("memory.json"), "{not json").unwrap();
        let store = store_in(&dir);
        assert!(store.is_empty());
    }

    #[test]
    fn test_recall_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.store(draft("integrate x squared over dx")).unwrap();
        store.store(draft("solve the equation 2x + 3 = 7")).unwrap();
        store.store(draft("solve the equation x + 1 = 5")).unwrap();

        let hits = store.recall("solve the equation 2x + 3 = 7", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(
            hits[0].record.parsed_problem.problem_text,
            "solve the equation 2x + 3 = 7"
        );
        assert!((hits[0].similarity - 1.0).abs() < f32::EPSILON);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn test_recall_respects_threshold_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        for i in 0..5 {
            store.store(draft(&format!("solve equation number {i}"))).unwrap();
        }

        // Unrelated query crosses no threshold.
        assert!(store.recall("derivative of sin", 10).is_empty());

        // All five match; limit keeps two.
        let hits = store.recall("solve equation number 9", 2);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_recall_tie_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let older = store.store(draft("solve for x now")).unwrap();
        let newer = store.store(draft("now solve for x")).unwrap();

        // Same token set, same score.
        let hits = store.recall("solve for x now", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, older);
        assert_eq!(hits[1].record.id, newer);
    }

    #[test]
    fn test_recall_blank_query_matches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.store(draft("solve x = 1")).unwrap();
        assert!(store.recall("", 10).is_empty());
        assert!(store.recall("   ", 10).is_empty());
    }

    #[test]
    fn test_apply_feedback_updates_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let id = store.store(draft("solve x = 1")).unwrap();

        store
            .apply_feedback(id, Feedback::Correct, "nice and clear")
            .unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.records()[0].feedback, Feedback::Correct);
        assert_eq!(reopened.records()[0].user_comment, "nice and clear");
    }

    #[test]
    fn test_apply_feedback_unknown_id_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let result = store.apply_feedback(Uuid::new_v4(), Feedback::Correct, "");
        assert!(result.is_err());
    }

    #[test]
    fn test_clear_empties_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.store(draft("solve x = 1")).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(store.recall("solve x = 1", 10).is_empty());

        let reopened = store_in(&dir);
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_similarity_identical_texts() {
        assert!((text_similarity("solve for x", "Solve FOR x") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_similarity_disjoint_texts() {
        assert!(text_similarity("alpha beta", "gamma delta").abs() < f32::EPSILON);
    }

    #[test]
    fn test_similarity_partial_overlap() {
        // Tokens {a, b, c} vs {b, c, d}: 2 shared of 4 total.
        assert!((text_similarity("a b c", "b c d") - 0.5).abs() < f32::EPSILON);
    }
}
