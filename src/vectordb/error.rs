use thiserror::Error;

use super::model::TierKind;

#[derive(Debug, Error)]
/// Errors returned by vector tier operations.
///
/// Every variant carries the tier so that logs identify which index degraded.
pub enum TierError {
    /// Could not connect to the tier's endpoint.
    #[error("{tier} tier: failed to connect to '{url}': {message}")]
    ConnectionFailed {
        /// Tier identity.
        tier: TierKind,
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Index creation failed for a reason other than "already exists".
    #[error("{tier} tier: failed to create index '{index}': {message}")]
    CreateIndexFailed {
        /// Tier identity.
        tier: TierKind,
        /// Index or collection name.
        index: String,
        /// Error message.
        message: String,
    },

    /// Upsert failed.
    #[error("{tier} tier: failed to upsert into '{index}': {message}")]
    UpsertFailed {
        /// Tier identity.
        tier: TierKind,
        /// Index or collection name.
        index: String,
        /// Error message.
        message: String,
    },

    /// KNN query failed.
    #[error("{tier} tier: failed to search '{index}': {message}")]
    SearchFailed {
        /// Tier identity.
        tier: TierKind,
        /// Index or collection name.
        index: String,
        /// Error message.
        message: String,
    },

    /// Vector dimension does not match the index schema.
    #[error("{tier} tier: invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Tier identity.
        tier: TierKind,
        /// Schema dimension.
        expected: usize,
        /// Supplied dimension.
        actual: usize,
    },

    /// The call did not complete within the configured bound.
    #[error("{tier} tier: {operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Tier identity.
        tier: TierKind,
        /// Operation label (`knn`, `upsert`, ...).
        operation: &'static str,
        /// Configured bound.
        timeout_ms: u64,
    },
}

impl TierError {
    /// Returns the tier that produced this error.
    pub fn tier(&self) -> TierKind {
        match self {
            Self::ConnectionFailed { tier, .. }
            | Self::CreateIndexFailed { tier, .. }
            | Self::UpsertFailed { tier, .. }
            | Self::SearchFailed { tier, .. }
            | Self::InvalidDimension { tier, .. }
            | Self::Timeout { tier, .. } => *tier,
        }
    }

    /// Short, stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionFailed { .. } => "connection",
            Self::CreateIndexFailed { .. } => "create_index",
            Self::UpsertFailed { .. } => "upsert",
            Self::SearchFailed { .. } => "search",
            Self::InvalidDimension { .. } => "dimension",
            Self::Timeout { .. } => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{tier} tier: dropping malformed document '{document}': {reason}")]
/// A single document in a KNN result could not be turned into a candidate.
///
/// Never propagated: the document is dropped and the rest of the result set is used.
pub struct MalformedResultError {
    /// Tier identity.
    pub tier: TierKind,
    /// Document key or point id (or `<unknown>`).
    pub document: String,
    /// What was missing or unparsable.
    pub reason: String,
}

impl MalformedResultError {
    pub fn new(tier: TierKind, document: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tier,
            document: document.into(),
            reason: reason.into(),
        }
    }
}
