use chrono::{DateTime, Utc};

use crate::embedding::Embedding;

/// Which tier of the cache an index belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKind {
    /// Colocated, volatile index checked first (Redis).
    Fast,
    /// Managed, durable index checked second (Qdrant).
    Durable,
}

impl TierKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Fast => "fast",
            TierKind::Durable => "durable",
        }
    }
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question/answer pair with the embedding of the question.
///
/// Each tier stores its own copy under its own namespace; there are no cross-tier
/// references.
#[derive(Debug, Clone)]
pub struct QaEntry {
    /// Time-ordered identifier (UUIDv7).
    pub id: String,
    pub question: String,
    pub response: String,
    pub embedding: Embedding,
    pub created_at: DateTime<Utc>,
}

impl QaEntry {
    pub fn new(
        question: impl Into<String>,
        response: impl Into<String>,
        embedding: Embedding,
    ) -> Self {
        Self {
            id: generate_entry_id(),
            question: question.into(),
            response: response.into(),
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// A cached answer returned by a KNN query, normalized across backends.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub response: String,
    /// Cosine similarity in `[-1, 1]`; higher is more similar.
    pub score: f32,
    /// The question the answer was stored under, when the backend returns it.
    pub question: Option<String>,
}

impl MatchCandidate {
    pub fn new(response: impl Into<String>, score: f32) -> Self {
        Self {
            response: response.into(),
            score,
            question: None,
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Strictly greater than `threshold`; a score exactly at the threshold is a miss.
    #[inline]
    pub fn is_accepted(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

/// Generates a time-ordered entry id.
pub fn generate_entry_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Sorts candidates by descending similarity.
pub fn sort_by_score_desc(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}
