use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::error::{ProviderError, StoreError};
use super::provider::EmbeddingProvider;
use super::store::EmbeddingStore;
use super::types::Embedding;

/// Turns text into an embedding: fast cache, then durable store, then provider.
///
/// Store failures degrade to misses. Only a provider failure reaches the caller.
/// A stored embedding whose length differs from `dimension` is corrupt: it reads
/// as a miss and is overwritten by the provider's result.
pub struct EmbeddingResolver<P, C, S> {
    provider: Arc<P>,
    cache: Arc<C>,
    store: Option<Arc<S>>,
    dimension: usize,
    timeout: Duration,
}

impl<P, C, S> Clone for EmbeddingResolver<P, C, S> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            cache: Arc::clone(&self.cache),
            store: self.store.clone(),
            dimension: self.dimension,
            timeout: self.timeout,
        }
    }
}

impl<P, C, S> std::fmt::Debug for EmbeddingResolver<P, C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingResolver")
            .field("has_durable_store", &self.store.is_some())
            .field("dimension", &self.dimension)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<P, C, S> EmbeddingResolver<P, C, S>
where
    P: EmbeddingProvider + 'static,
    C: EmbeddingStore + 'static,
    S: EmbeddingStore + 'static,
{
    pub fn new(
        provider: Arc<P>,
        cache: Arc<C>,
        store: Option<Arc<S>>,
        dimension: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            store,
            dimension,
            timeout,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn store(&self) -> Option<&Arc<S>> {
        self.store.as_ref()
    }

    /// Resolves `text` to an embedding.
    ///
    /// Write-backs run as detached tasks; they never delay or fail the caller.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn resolve(&self, text: &str) -> Result<Embedding, ProviderError> {
        if let Some(embedding) = self.lookup(self.cache.as_ref(), text).await {
            debug!(source = "fast_cache", "Embedding resolved");
            return Ok(embedding);
        }

        if let Some(store) = &self.store {
            if let Some(embedding) = self.lookup(store.as_ref(), text).await {
                debug!(source = "durable_store", "Embedding resolved");
                spawn_put(Arc::clone(&self.cache), text, &embedding, self.timeout);
                return Ok(embedding);
            }
        }

        let embedding = match tokio::time::timeout(self.timeout, self.provider.embed(text)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderError::new(format!(
                    "{} timed out after {}ms",
                    self.provider.name(),
                    self.timeout.as_millis()
                )));
            }
        };
        debug!(source = "provider", provider = self.provider.name(), "Embedding resolved");

        if let Some(store) = &self.store {
            spawn_put(Arc::clone(store), text, &embedding, self.timeout);
        }
        spawn_put(Arc::clone(&self.cache), text, &embedding, self.timeout);

        Ok(embedding)
    }

    async fn lookup<T: EmbeddingStore>(&self, store: &T, text: &str) -> Option<Embedding> {
        let result = match tokio::time::timeout(self.timeout, store.get(text)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                store: store.name(),
                operation: "get",
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        let result = result.and_then(|found| match found {
            Some(embedding) if embedding.dim() != self.dimension => Err(StoreError::Corrupt {
                store: store.name(),
                message: format!(
                    "expected {} components, found {}",
                    self.dimension,
                    embedding.dim()
                ),
            }),
            found => Ok(found),
        });

        match result {
            Ok(found) => found,
            Err(e) => {
                warn!(store = store.name(), error = %e, "Embedding lookup failed, treating as miss");
                None
            }
        }
    }
}

fn spawn_put<T>(store: Arc<T>, text: &str, embedding: &Embedding, timeout: Duration)
where
    T: EmbeddingStore + 'static,
{
    let text = text.to_string();
    let embedding = embedding.clone();
    tokio::spawn(async move {
        let result = match tokio::time::timeout(timeout, store.put(&text, &embedding)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                store: store.name(),
                operation: "put",
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(()) => debug!(store = store.name(), "Embedding written back"),
            Err(e) => warn!(store = store.name(), error = %e, "Embedding write-back failed"),
        }
    });
}
