//! Cross-cutting, shared constants.
//!
//! # Dimension Invariants
//!
//! Both vector tiers, the embedding cache and the provider must agree on one embedding
//! dimension. The compile-time default matches `text-embedding-3-small`; a different
//! provider model can be configured at runtime (`RECALL_EMBEDDING_DIM`), and
//! [`validate_embedding_dim`] is used at tier boundaries to reject mismatched vectors.

pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Acceptance threshold for a cached answer (strictly greater than).
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.92;

/// Neighbours requested from each tier.
pub const DEFAULT_TOP_K: usize = 5;

/// Upper bound for any single network call (KNN, upsert, embedding, store I/O).
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;

/// Chat completions are slower than the cache calls and get their own bound.
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 60;

/// Retention for the durable embedding store, enforced by the store's TTL index.
pub const DEFAULT_EMBEDDING_TTL_DAYS: u64 = 30;

/// Key prefix for the fast embedding cache.
pub const EMBEDDING_CACHE_PREFIX: &str = "embedding:";

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use recall::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// validate_embedding_dim(1536, DEFAULT_EMBEDDING_DIM).unwrap();
/// assert!(validate_embedding_dim(768, DEFAULT_EMBEDDING_DIM).is_err());
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
