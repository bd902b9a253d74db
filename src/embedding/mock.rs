//! In-memory embedding provider and stores for tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::error::{ProviderError, StoreError};
use super::provider::EmbeddingProvider;
use super::store::EmbeddingStore;
use super::types::Embedding;

/// Deterministic provider: vectors are derived from a BLAKE3 XOF of the text.
pub struct MockEmbeddingProvider {
    dimension: usize,
    overrides: RwLock<HashMap<String, Embedding>>,
    failure: RwLock<Option<ProviderError>>,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            overrides: RwLock::new(HashMap::new()),
            failure: RwLock::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Pins the vector returned for `text`.
    pub fn set_embedding(&self, text: &str, embedding: Embedding) {
        self.overrides
            .write()
            .expect("lock poisoned")
            .insert(text.to_string(), embedding);
    }

    /// Makes every call fail with `error` (`None` restores normal behavior).
    pub fn set_failure(&self, error: Option<ProviderError>) {
        *self.failure.write().expect("lock poisoned") = error;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector this provider derives for `text`, without counting a call.
    pub fn derive(&self, text: &str) -> Embedding {
        derive_embedding(text, self.dimension)
    }
}

/// Unit-length pseudo-random vector seeded by `text`.
pub fn derive_embedding(text: &str, dimension: usize) -> Embedding {
    let mut hasher = blake3::Hasher::new();
    hasher.update(text.as_bytes());
    let mut reader = hasher.finalize_xof();

    let mut bytes = vec![0u8; dimension * 4];
    reader.fill(&mut bytes);

    let mut values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| {
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
        })
        .collect();

    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter_mut().for_each(|v| *v /= norm);
    }
    Embedding::new(values)
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failure.read().expect("lock poisoned").clone() {
            return Err(error);
        }

        let pinned = self
            .overrides
            .read()
            .expect("lock poisoned")
            .get(text)
            .cloned();
        Ok(pinned.unwrap_or_else(|| self.derive(text)))
    }
}

/// HashMap-backed [`EmbeddingStore`] with call counters and failure switches.
#[derive(Default)]
pub struct MockEmbeddingStore {
    entries: RwLock<HashMap<String, Embedding>>,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MockEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, text: &str, embedding: Embedding) {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(text.to_string(), embedding);
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.read().expect("lock poisoned").contains_key(text)
    }

    pub fn entry(&self, text: &str) -> Option<Embedding> {
        self.entries.read().expect("lock poisoned").get(text).cloned()
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EmbeddingStore for MockEmbeddingStore {
    fn name(&self) -> &'static str {
        "mock-store"
    }

    async fn get(&self, text: &str) -> Result<Option<Embedding>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::LookupFailed {
                store: "mock-store",
                message: "injected failure".to_string(),
            });
        }
        Ok(self.entry(text))
    }

    async fn put(&self, text: &str, embedding: &Embedding) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                store: "mock-store",
                message: "injected failure".to_string(),
            });
        }
        self.insert(text, embedding.clone());
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        !self.fail_get.load(Ordering::SeqCst)
    }
}
