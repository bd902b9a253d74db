//! Similarity cascade: fast tier, then durable tier, gated by a strict threshold.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::error::CascadeConfigError;
use super::types::CacheStatus;
use crate::constants::{DEFAULT_CALL_TIMEOUT_MS, DEFAULT_MATCH_THRESHOLD, DEFAULT_TOP_K};
use crate::embedding::Embedding;
#[cfg(any(test, feature = "mock"))]
use crate::vectordb::MockVectorTier;
use crate::vectordb::{MatchCandidate, QaEntry, TierKind, VectorTier, with_deadline};

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeConfig {
    /// Candidates must score strictly above this similarity.
    pub threshold: f32,
    pub top_k: usize,
    /// Bound applied to every tier call.
    pub call_timeout: Duration,
    /// Copy durable-tier hits into the fast tier.
    pub backfill: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            backfill: true,
        }
    }
}

impl CascadeConfig {
    pub fn validate(&self) -> Result<(), CascadeConfigError> {
        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(CascadeConfigError::ThresholdOutOfRange {
                value: self.threshold,
            });
        }
        if self.top_k == 0 {
            return Err(CascadeConfigError::ZeroTopK);
        }
        if self.call_timeout.is_zero() {
            return Err(CascadeConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CascadeResult {
    Hit {
        tier: TierKind,
        candidate: MatchCandidate,
    },
    Miss,
}

impl CascadeResult {
    pub fn status(&self) -> CacheStatus {
        match self {
            CascadeResult::Hit { tier, .. } => CacheStatus::from(*tier),
            CascadeResult::Miss => CacheStatus::Miss,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CascadeResult::Hit { .. })
    }

    pub fn candidate(&self) -> Option<&MatchCandidate> {
        match self {
            CascadeResult::Hit { candidate, .. } => Some(candidate),
            CascadeResult::Miss => None,
        }
    }
}

/// Queries the fast tier and falls back to the durable tier.
///
/// Tier failures and timeouts count as "no result"; the cascade itself never fails.
pub struct SimilarityCascade<F, D> {
    fast: Arc<F>,
    durable: Arc<D>,
    config: CascadeConfig,
}

impl<F, D> Clone for SimilarityCascade<F, D> {
    fn clone(&self) -> Self {
        Self {
            fast: Arc::clone(&self.fast),
            durable: Arc::clone(&self.durable),
            config: self.config.clone(),
        }
    }
}

impl<F, D> std::fmt::Debug for SimilarityCascade<F, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityCascade")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<F, D> SimilarityCascade<F, D>
where
    F: VectorTier + 'static,
    D: VectorTier + 'static,
{
    pub fn new(fast: Arc<F>, durable: Arc<D>, config: CascadeConfig) -> Self {
        Self {
            fast,
            durable,
            config,
        }
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn fast(&self) -> &Arc<F> {
        &self.fast
    }

    pub fn durable(&self) -> &Arc<D> {
        &self.durable
    }

    /// Finds a cached answer for `embedding`.
    ///
    /// A durable hit is backfilled under the candidate's stored question, if any.
    pub async fn find_best_answer(&self, embedding: &Embedding) -> CascadeResult {
        self.cascade(None, embedding).await
    }

    /// Like [`find_best_answer`](Self::find_best_answer), but backfills under `question`.
    pub async fn lookup(&self, question: &str, embedding: &Embedding) -> CascadeResult {
        self.cascade(Some(question), embedding).await
    }

    #[instrument(skip(self, question, embedding), fields(dim = embedding.dim(), threshold = self.config.threshold))]
    async fn cascade(&self, question: Option<&str>, embedding: &Embedding) -> CascadeResult {
        if let Some(candidate) = self.best_accepted(self.fast.as_ref(), embedding).await {
            info!(tier = %TierKind::Fast, score = candidate.score, "Cache hit");
            return CascadeResult::Hit {
                tier: TierKind::Fast,
                candidate,
            };
        }

        debug!("Fast tier miss, checking durable tier");

        if let Some(candidate) = self.best_accepted(self.durable.as_ref(), embedding).await {
            info!(tier = %TierKind::Durable, score = candidate.score, "Cache hit");
            if self.config.backfill {
                let backfill_question = question
                    .map(str::to_string)
                    .or_else(|| candidate.question.clone());
                match backfill_question {
                    Some(q) => self.spawn_backfill(q, candidate.response.clone(), embedding.clone()),
                    None => debug!("No question text for backfill, skipping"),
                }
            }
            return CascadeResult::Hit {
                tier: TierKind::Durable,
                candidate,
            };
        }

        debug!("Cache miss");
        CascadeResult::Miss
    }

    /// Top candidate of `tier` if it clears the threshold.
    async fn best_accepted<T: VectorTier>(
        &self,
        tier: &T,
        embedding: &Embedding,
    ) -> Option<MatchCandidate> {
        let result = with_deadline(
            tier.kind(),
            "knn",
            self.config.call_timeout,
            tier.knn(embedding, self.config.top_k),
        )
        .await;

        let candidates = match result {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(tier = %tier.kind(), kind = e.kind(), error = %e, "Tier search failed, skipping");
                return None;
            }
        };

        let best = candidates.into_iter().next()?;
        if best.is_accepted(self.config.threshold) {
            Some(best)
        } else {
            debug!(tier = %tier.kind(), score = best.score, "Best candidate below threshold");
            None
        }
    }

    fn spawn_backfill(&self, question: String, response: String, embedding: Embedding) {
        let fast = Arc::clone(&self.fast);
        let timeout = self.config.call_timeout;
        tokio::spawn(async move {
            let entry = QaEntry::new(question, response, embedding);
            match with_deadline(TierKind::Fast, "upsert", timeout, fast.upsert(&entry)).await {
                Ok(id) => debug!(tier = %TierKind::Fast, id = %id, "Backfilled durable hit"),
                Err(e) => warn!(tier = %TierKind::Fast, error = %e, "Backfill failed"),
            }
        });
    }
}

#[cfg(any(test, feature = "mock"))]
pub type MockSimilarityCascade = SimilarityCascade<MockVectorTier, MockVectorTier>;

#[cfg(any(test, feature = "mock"))]
impl SimilarityCascade<MockVectorTier, MockVectorTier> {
    /// Cascade over two empty in-memory tiers of dimension `dim`.
    pub fn new_mock(dim: usize, config: CascadeConfig) -> Self {
        Self::new(
            Arc::new(MockVectorTier::fast(dim)),
            Arc::new(MockVectorTier::durable(dim)),
            config,
        )
    }
}
