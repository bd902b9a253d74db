use thiserror::Error;

use crate::embedding::ProviderError;
use crate::generation::GenerationError;

#[derive(Debug, Clone, PartialEq, Error)]
/// Invalid similarity cascade settings.
pub enum CascadeConfigError {
    /// Threshold outside the cosine similarity range.
    #[error("match threshold {value} is outside [-1, 1]")]
    ThresholdOutOfRange {
        /// Configured threshold.
        value: f32,
    },

    /// `k` must select at least one candidate.
    #[error("top_k must be greater than zero")]
    ZeroTopK,

    /// Every network call needs a non-zero bound.
    #[error("call timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Error)]
/// Errors that abort answering a question.
pub enum AnswerError {
    /// No embedding could be produced for the question.
    #[error(transparent)]
    Embedding(#[from] ProviderError),

    /// The generative provider failed on a cache miss.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
