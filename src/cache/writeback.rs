//! Write-back of freshly generated answers into both tiers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::embedding::Embedding;
use crate::vectordb::{QaEntry, TierError, VectorTier, with_deadline};

/// Per-tier outcome of one [`WriteBackCoordinator::record_answer`] call.
#[derive(Debug)]
pub struct WriteBackReport {
    pub entry_id: String,
    /// Fast-tier document id, or why the write was lost.
    pub fast: Result<String, TierError>,
    /// Durable-tier point id, or why the write was lost.
    pub durable: Result<String, TierError>,
}

impl WriteBackReport {
    pub fn is_complete(&self) -> bool {
        self.fast.is_ok() && self.durable.is_ok()
    }
}

/// Persists a new question/answer/vector into both tiers independently.
///
/// No cross-tier atomicity: one tier failing leaves the other's write in place.
pub struct WriteBackCoordinator<F, D> {
    fast: Arc<F>,
    durable: Arc<D>,
    call_timeout: Duration,
}

impl<F, D> Clone for WriteBackCoordinator<F, D> {
    fn clone(&self) -> Self {
        Self {
            fast: Arc::clone(&self.fast),
            durable: Arc::clone(&self.durable),
            call_timeout: self.call_timeout,
        }
    }
}

impl<F, D> std::fmt::Debug for WriteBackCoordinator<F, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBackCoordinator")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl<F, D> WriteBackCoordinator<F, D>
where
    F: VectorTier + 'static,
    D: VectorTier + 'static,
{
    pub fn new(fast: Arc<F>, durable: Arc<D>, call_timeout: Duration) -> Self {
        Self {
            fast,
            durable,
            call_timeout,
        }
    }

    /// Upserts one entry into both tiers concurrently.
    #[instrument(skip_all, fields(question_len = question.len(), response_len = response.len()))]
    pub async fn record_answer(
        &self,
        question: &str,
        response: &str,
        embedding: &Embedding,
    ) -> WriteBackReport {
        let entry = QaEntry::new(question, response, embedding.clone());

        let (fast, durable) = tokio::join!(
            self.upsert(self.fast.as_ref(), &entry),
            self.upsert(self.durable.as_ref(), &entry),
        );

        WriteBackReport {
            entry_id: entry.id,
            fast,
            durable,
        }
    }

    /// Runs [`record_answer`](Self::record_answer) as a detached task.
    pub fn spawn_record_answer(
        &self,
        question: String,
        response: String,
        embedding: Embedding,
    ) -> JoinHandle<WriteBackReport> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator
                .record_answer(&question, &response, &embedding)
                .await
        })
    }

    async fn upsert<T: VectorTier>(&self, tier: &T, entry: &QaEntry) -> Result<String, TierError> {
        let result = with_deadline(tier.kind(), "upsert", self.call_timeout, tier.upsert(entry)).await;
        match &result {
            Ok(id) => debug!(tier = %tier.kind(), id = %id, "Stored answer"),
            Err(e) => warn!(tier = %tier.kind(), kind = e.kind(), error = %e, "Write-back failed"),
        }
        result
    }
}
