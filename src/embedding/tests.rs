use std::sync::Arc;
use std::time::Duration;

use super::*;

const DIM: usize = 16;

type Resolver = EmbeddingResolver<MockEmbeddingProvider, MockEmbeddingStore, MockEmbeddingStore>;

struct Harness {
    provider: Arc<MockEmbeddingProvider>,
    cache: Arc<MockEmbeddingStore>,
    store: Arc<MockEmbeddingStore>,
    resolver: Resolver,
}

fn harness() -> Harness {
    let provider = Arc::new(MockEmbeddingProvider::new(DIM));
    let cache = Arc::new(MockEmbeddingStore::new());
    let store = Arc::new(MockEmbeddingStore::new());
    let resolver = EmbeddingResolver::new(
        Arc::clone(&provider),
        Arc::clone(&cache),
        Some(Arc::clone(&store)),
        DIM,
        Duration::from_millis(200),
    );
    Harness {
        provider,
        cache,
        store,
        resolver,
    }
}

async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 1s");
}

#[tokio::test]
async fn test_fast_cache_hit_skips_store_and_provider() {
    let h = harness();
    let cached = Embedding::new(vec![0.25; DIM]);
    h.cache.insert("What is Redis?", cached.clone());

    let resolved = h.resolver.resolve("What is Redis?").await.unwrap();

    assert_eq!(resolved, cached);
    assert_eq!(h.store.gets(), 0);
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_durable_hit_backfills_fast_cache() {
    let h = harness();
    let stored = Embedding::new(vec![0.5; DIM]);
    h.store.insert("What is Redis?", stored.clone());

    let resolved = h.resolver.resolve("What is Redis?").await.unwrap();

    assert_eq!(resolved, stored);
    assert_eq!(h.provider.calls(), 0);
    eventually(|| h.cache.contains("What is Redis?")).await;
    assert_eq!(h.cache.entry("What is Redis?"), Some(stored));
    assert_eq!(h.store.puts(), 0);
}

#[tokio::test]
async fn test_miss_calls_provider_once_and_writes_both() {
    let h = harness();

    let resolved = h.resolver.resolve("What is Qdrant?").await.unwrap();

    assert_eq!(h.provider.calls(), 1);
    assert_eq!(resolved.dim(), DIM);
    assert_eq!(resolved, h.provider.derive("What is Qdrant?"));
    eventually(|| h.cache.contains("What is Qdrant?") && h.store.contains("What is Qdrant?")).await;

    // Second resolution is served by the fast cache.
    let again = h.resolver.resolve("What is Qdrant?").await.unwrap();
    assert_eq!(again, resolved);
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn test_provider_failure_propagates() {
    let h = harness();
    h.provider
        .set_failure(Some(ProviderError::with_status("quota exceeded", 429)));

    let err = h.resolver.resolve("anything?").await.unwrap_err();

    assert!(err.is_quota());
    assert_eq!(err.status_code, Some(429));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.cache.is_empty());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_store_failures_degrade_to_misses() {
    let h = harness();
    h.cache.set_fail_get(true);
    h.store.set_fail_get(true);

    let resolved = h.resolver.resolve("hello?").await;

    assert!(resolved.is_ok());
    assert_eq!(h.cache.gets(), 1);
    assert_eq!(h.store.gets(), 1);
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn test_write_failures_are_not_propagated() {
    let h = harness();
    h.cache.set_fail_put(true);
    h.store.set_fail_put(true);

    assert!(h.resolver.resolve("hello?").await.is_ok());
    eventually(|| h.cache.puts() == 1 && h.store.puts() == 1).await;
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_keys_are_exact_text() {
    let h = harness();
    h.cache
        .insert("What is Redis?", Embedding::new(vec![1.0; DIM]));

    h.resolver.resolve("what is redis?").await.unwrap();

    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn test_wrong_dimension_in_fast_cache_is_replaced() {
    let h = harness();
    h.cache
        .insert("What is Redis?", Embedding::new(vec![0.25; DIM / 2]));

    let resolved = h.resolver.resolve("What is Redis?").await.unwrap();

    assert_eq!(resolved.dim(), DIM);
    assert_eq!(h.store.gets(), 1);
    assert_eq!(h.provider.calls(), 1);
    eventually(|| h.cache.entry("What is Redis?").is_some_and(|e| e.dim() == DIM)).await;

    let again = h.resolver.resolve("What is Redis?").await.unwrap();
    assert_eq!(again, resolved);
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn test_wrong_dimension_in_durable_store_is_not_backfilled() {
    let h = harness();
    h.store
        .insert("What is Qdrant?", Embedding::new(vec![0.5; DIM + 1]));

    let resolved = h.resolver.resolve("What is Qdrant?").await.unwrap();

    assert_eq!(resolved.dim(), DIM);
    assert_eq!(h.provider.calls(), 1);
    eventually(|| h.store.entry("What is Qdrant?").is_some_and(|e| e.dim() == DIM)).await;
    eventually(|| h.cache.entry("What is Qdrant?").is_some_and(|e| e.dim() == DIM)).await;
}

#[tokio::test]
async fn test_resolver_without_durable_store() {
    let provider = Arc::new(MockEmbeddingProvider::new(DIM));
    let cache = Arc::new(MockEmbeddingStore::new());
    let resolver: Resolver = EmbeddingResolver::new(
        Arc::clone(&provider),
        Arc::clone(&cache),
        None,
        DIM,
        Duration::from_millis(200),
    );

    resolver.resolve("no store?").await.unwrap();

    assert_eq!(provider.calls(), 1);
    eventually(|| cache.contains("no store?")).await;
    assert!(resolver.store().is_none());
}

#[test]
fn test_derived_embeddings_are_deterministic_unit_vectors() {
    let a = derive_embedding("What is Redis?", DIM);
    let b = derive_embedding("What is Redis?", DIM);
    let c = derive_embedding("What is Qdrant?", DIM);

    assert_eq!(a, b);
    assert_ne!(a, c);
    let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
}

#[test]
fn test_embedding_bytes_round_trip() {
    let embedding = derive_embedding("blob", DIM);
    let decoded = Embedding::from_bytes(&embedding.to_bytes()).unwrap();
    assert_eq!(decoded, embedding);
    assert!(Embedding::from_bytes(&[0u8; 5]).is_err());

    assert_eq!(
        Embedding::from_bytes_with_dim(&embedding.to_bytes(), DIM).unwrap(),
        embedding
    );
    assert!(Embedding::from_bytes_with_dim(&embedding.to_bytes(), DIM * 2).is_err());
}

#[test]
fn test_provider_error_display() {
    assert_eq!(
        ProviderError::with_status("Rate limit reached", 429).to_string(),
        "embedding provider error (status 429): Rate limit reached"
    );
    assert_eq!(
        ProviderError::new("connection reset").to_string(),
        "embedding provider error: connection reset"
    );
}
