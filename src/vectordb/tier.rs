use std::future::Future;
use std::time::Duration;

use super::error::TierError;
use super::model::{MatchCandidate, QaEntry, TierKind};

/// Uniform contract over one vector index of the answer cache.
///
/// Implementations normalize their backend's result shape into [`MatchCandidate`]
/// and their backend's score convention into cosine similarity, so callers never
/// branch on backend.
pub trait VectorTier: Send + Sync {
    /// Which tier this index serves.
    fn kind(&self) -> TierKind;

    /// Backend index or collection name.
    fn name(&self) -> &str;

    /// Vector dimension declared by the index schema.
    fn dimension(&self) -> usize;

    /// Returns `true` if the backend answers a basic health probe.
    fn is_ready(&self) -> impl Future<Output = bool> + Send;

    /// Creates the index if missing. An "already exists" response is not an error.
    fn ensure_index(&self) -> impl Future<Output = Result<(), TierError>> + Send;

    /// Writes `entry` and returns the tier-local document id.
    fn upsert(&self, entry: &QaEntry) -> impl Future<Output = Result<String, TierError>> + Send;

    /// Returns up to `k` candidates sorted by descending similarity.
    ///
    /// Malformed documents are dropped, never returned as partial candidates.
    fn knn(
        &self,
        query: &[f32],
        k: usize,
    ) -> impl Future<Output = Result<Vec<MatchCandidate>, TierError>> + Send;
}

/// Runs `fut` with an upper bound; expiry becomes [`TierError::Timeout`].
pub async fn with_deadline<T, F>(
    tier: TierKind,
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, TierError>
where
    F: Future<Output = Result<T, TierError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(TierError::Timeout {
            tier,
            operation,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Matches the "index/collection already exists" family of backend errors.
pub fn is_already_exists(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already exists")
}

pub(crate) fn check_dimension(
    tier: TierKind,
    expected: usize,
    actual: usize,
) -> Result<(), TierError> {
    crate::constants::validate_embedding_dim(actual, expected)
        .map_err(|_| TierError::InvalidDimension {
            tier,
            expected,
            actual,
        })
}
