//! In-memory [`VectorTier`] used by unit and integration tests.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use super::error::TierError;
use super::model::{MatchCandidate, QaEntry, TierKind, sort_by_score_desc};
use super::tier::{VectorTier, check_dimension};

/// Brute-force cosine tier with failure injection and canned results.
pub struct MockVectorTier {
    kind: TierKind,
    dimension: usize,
    entries: RwLock<Vec<QaEntry>>,
    canned: RwLock<Option<Vec<MatchCandidate>>>,
    knn_delay: RwLock<Option<Duration>>,
    fail_knn: AtomicBool,
    fail_upsert: AtomicBool,
    fail_create: RwLock<Option<String>>,
    knn_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
}

impl MockVectorTier {
    pub fn new(kind: TierKind, dimension: usize) -> Self {
        Self {
            kind,
            dimension,
            entries: RwLock::new(Vec::new()),
            canned: RwLock::new(None),
            knn_delay: RwLock::new(None),
            fail_knn: AtomicBool::new(false),
            fail_upsert: AtomicBool::new(false),
            fail_create: RwLock::new(None),
            knn_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    pub fn fast(dimension: usize) -> Self {
        Self::new(TierKind::Fast, dimension)
    }

    pub fn durable(dimension: usize) -> Self {
        Self::new(TierKind::Durable, dimension)
    }

    /// Makes every `knn` return exactly `candidates` (sorted) instead of searching.
    pub fn set_canned_results(&self, candidates: Vec<MatchCandidate>) {
        *self.canned.write().expect("lock poisoned") = Some(candidates);
    }

    pub fn set_knn_delay(&self, delay: Duration) {
        *self.knn_delay.write().expect("lock poisoned") = Some(delay);
    }

    pub fn set_fail_knn(&self, fail: bool) {
        self.fail_knn.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    /// Makes `ensure_index` fail with `message` (use "Index already exists" to
    /// exercise the idempotent path).
    pub fn set_create_error(&self, message: &str) {
        *self.fail_create.write().expect("lock poisoned") = Some(message.to_string());
    }

    pub fn knn_calls(&self) -> usize {
        self.knn_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn entries(&self) -> Vec<QaEntry> {
        self.entries.read().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VectorTier for MockVectorTier {
    fn kind(&self) -> TierKind {
        self.kind
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn is_ready(&self) -> bool {
        !self.fail_knn.load(Ordering::SeqCst)
    }

    async fn ensure_index(&self) -> Result<(), TierError> {
        let message = self.fail_create.read().expect("lock poisoned").clone();
        match message {
            Some(message) if super::tier::is_already_exists(&message) => Ok(()),
            Some(message) => Err(TierError::CreateIndexFailed {
                tier: self.kind,
                index: "mock".to_string(),
                message,
            }),
            None => Ok(()),
        }
    }

    async fn upsert(&self, entry: &QaEntry) -> Result<String, TierError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(TierError::UpsertFailed {
                tier: self.kind,
                index: "mock".to_string(),
                message: "injected failure".to_string(),
            });
        }
        check_dimension(self.kind, self.dimension, entry.embedding.dim())?;

        self.entries
            .write()
            .expect("lock poisoned")
            .push(entry.clone());
        Ok(entry.id.clone())
    }

    async fn knn(&self, query: &[f32], k: usize) -> Result<Vec<MatchCandidate>, TierError> {
        self.knn_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.knn_delay.read().expect("lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_knn.load(Ordering::SeqCst) {
            return Err(TierError::SearchFailed {
                tier: self.kind,
                index: "mock".to_string(),
                message: "injected failure".to_string(),
            });
        }

        let canned = self.canned.read().expect("lock poisoned").clone();
        let mut results = match canned {
            Some(candidates) => candidates,
            None => {
                check_dimension(self.kind, self.dimension, query.len())?;
                self.entries
                    .read()
                    .expect("lock poisoned")
                    .iter()
                    .map(|e| {
                        MatchCandidate::new(e.response.clone(), cosine_similarity(query, &e.embedding))
                            .with_question(e.question.clone())
                    })
                    .collect()
            }
        };

        sort_by_score_desc(&mut results);
        results.truncate(k);
        Ok(results)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
