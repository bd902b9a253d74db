//! End-to-end answer flow over in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use recall::bot::{Bot, Dispatcher, MockTransport, responses};
use recall::cache::{
    AnswerError, AnswerPipeline, CacheStatus, CascadeConfig, QuestionAnswerer, SimilarityCascade,
    WriteBackCoordinator,
};
use recall::embedding::{
    Embedding, EmbeddingResolver, MockEmbeddingProvider, MockEmbeddingStore, ProviderError,
};
use recall::generation::MockGenerator;
use recall::vectordb::{MatchCandidate, MockVectorTier};

const DIM: usize = 16;

type Pipeline = AnswerPipeline<
    MockEmbeddingProvider,
    MockEmbeddingStore,
    MockEmbeddingStore,
    MockVectorTier,
    MockVectorTier,
>;

struct Harness {
    provider: Arc<MockEmbeddingProvider>,
    cache: Arc<MockEmbeddingStore>,
    store: Arc<MockEmbeddingStore>,
    fast: Arc<MockVectorTier>,
    durable: Arc<MockVectorTier>,
    generator: Arc<MockGenerator>,
    pipeline: Arc<Pipeline>,
}

fn harness() -> Harness {
    let timeout = Duration::from_millis(200);
    let provider = Arc::new(MockEmbeddingProvider::new(DIM));
    let cache = Arc::new(MockEmbeddingStore::new());
    let store = Arc::new(MockEmbeddingStore::new());
    let fast = Arc::new(MockVectorTier::fast(DIM));
    let durable = Arc::new(MockVectorTier::durable(DIM));
    let generator = Arc::new(MockGenerator::new());

    let pipeline = AnswerPipeline::new(
        EmbeddingResolver::new(
            Arc::clone(&provider),
            Arc::clone(&cache),
            Some(Arc::clone(&store)),
            DIM,
            timeout,
        ),
        SimilarityCascade::new(
            Arc::clone(&fast),
            Arc::clone(&durable),
            CascadeConfig {
                call_timeout: timeout,
                ..Default::default()
            },
        ),
        WriteBackCoordinator::new(Arc::clone(&fast), Arc::clone(&durable), timeout),
        generator.clone(),
    );

    Harness {
        provider,
        cache,
        store,
        fast,
        durable,
        generator,
        pipeline: Arc::new(pipeline),
    }
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn test_miss_generates_and_second_ask_hits_fast_tier() {
    let h = harness();

    let first = h.pipeline.answer("How do I drain a node?").await.unwrap();
    assert_eq!(first.source, CacheStatus::Miss);
    assert_eq!(first.text, "generated answer to: How do I drain a node?");

    assert!(eventually(|| h.fast.len() == 1 && h.durable.len() == 1).await);
    assert!(eventually(|| h.cache.contains("How do I drain a node?")).await);
    assert!(eventually(|| h.store.contains("How do I drain a node?")).await);

    let second = h.pipeline.answer("How do I drain a node?").await.unwrap();
    assert_eq!(second.source, CacheStatus::HitFast);
    assert_eq!(second.text, first.text);

    assert_eq!(h.generator.calls(), 1);
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn test_similar_question_served_from_fast_tier() {
    let h = harness();
    h.fast.set_canned_results(vec![
        MatchCandidate::new("Redis stores data in-memory.", 0.95).with_question("How does Redis work?"),
    ]);

    let answer = h.pipeline.answer("What is Redis?").await.unwrap();

    assert_eq!(answer.source, CacheStatus::HitFast);
    assert_eq!(answer.text, "Redis stores data in-memory.");
    assert_eq!(h.durable.knn_calls(), 0);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn test_durable_hit_backfills_fast_tier() {
    let h = harness();
    h.durable.set_canned_results(vec![
        MatchCandidate::new("Use kubectl drain.", 0.97).with_question("drain a node?"),
    ]);

    let answer = h.pipeline.answer("How to drain a k8s node?").await.unwrap();

    assert_eq!(answer.source, CacheStatus::HitDurable);
    assert_eq!(answer.text, "Use kubectl drain.");
    assert!(eventually(|| h.fast.len() == 1).await);
    let backfilled = &h.fast.entries()[0];
    assert_eq!(backfilled.question, "How to drain a k8s node?");
    assert_eq!(backfilled.response, "Use kubectl drain.");
}

#[tokio::test]
async fn test_stale_embedding_dimension_is_recovered() {
    let h = harness();
    h.cache
        .insert("What is Redis?", Embedding::new(vec![0.5; DIM / 2]));

    let first = h.pipeline.answer("What is Redis?").await.unwrap();
    assert_eq!(first.source, CacheStatus::Miss);
    assert_eq!(h.provider.calls(), 1);
    assert!(eventually(|| h.fast.len() == 1 && h.durable.len() == 1).await);
    assert!(
        eventually(|| h
            .cache
            .entry("What is Redis?")
            .is_some_and(|e| e.dim() == DIM))
        .await
    );

    let second = h.pipeline.answer("What is Redis?").await.unwrap();
    assert_eq!(second.source, CacheStatus::HitFast);
    assert_eq!(h.provider.calls(), 1);
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn test_threshold_boundary_generates() {
    let h = harness();
    h.fast
        .set_canned_results(vec![MatchCandidate::new("borderline", 0.92)]);

    let answer = h.pipeline.answer("Is this close enough?").await.unwrap();

    assert_eq!(answer.source, CacheStatus::Miss);
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn test_provider_failure_aborts_before_lookup() {
    let h = harness();
    h.provider
        .set_failure(Some(ProviderError::with_status("quota exceeded", 429)));

    let err = h.pipeline.answer("Anyone there?").await.unwrap_err();

    assert!(matches!(err, AnswerError::Embedding(ref e) if e.is_quota()));
    assert_eq!(h.fast.knn_calls(), 0);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn test_generation_failure_writes_nothing() {
    let h = harness();
    h.generator.set_fail(true);

    let err = h.pipeline.answer("Why is the pod pending?").await.unwrap_err();

    assert!(matches!(err, AnswerError::Generation(_)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.fast.is_empty());
    assert!(h.durable.is_empty());
}

#[tokio::test]
async fn test_tier_outage_still_answers() {
    let h = harness();
    h.fast.set_fail_knn(true);
    h.durable.set_fail_knn(true);
    h.fast.set_fail_upsert(true);

    let answer = h.pipeline.answer("Is the cache down?").await.unwrap();

    assert_eq!(answer.source, CacheStatus::Miss);
    assert!(eventually(|| h.durable.len() == 1).await);
    assert!(h.fast.is_empty());
}

#[tokio::test]
async fn test_pinned_embeddings_share_answers_across_phrasings() {
    let h = harness();
    let mut v = vec![0.0; DIM];
    v[0] = 1.0;
    h.provider.set_embedding("What is Redis?", Embedding::new(v.clone()));
    h.provider
        .set_embedding("what's redis?", Embedding::new(v));

    let first = h.pipeline.answer("What is Redis?").await.unwrap();
    assert!(eventually(|| h.fast.len() == 1).await);

    let second = h.pipeline.answer("what's redis?").await.unwrap();
    assert_eq!(second.source, CacheStatus::HitFast);
    assert_eq!(second.text, first.text);
}

#[tokio::test]
async fn test_bot_marks_cached_replies() {
    let h = harness();
    let transport = Arc::new(MockTransport::new());
    let bot = Bot::new(
        transport.clone(),
        Dispatcher::standard(h.pipeline.clone(), h.generator.clone()),
    );
    let message = recall::bot::IncomingMessage {
        channel: "C1".to_string(),
        ts: "1700000000.000100".to_string(),
        thread_ts: None,
        text: Some("What does SLO stand for?".to_string()),
        user: Some("U1".to_string()),
        subtype: None,
    };

    bot.handle_message(&message).await;
    assert!(eventually(|| h.fast.len() == 1).await);
    bot.handle_message(&message).await;

    let texts = transport.texts();
    assert_eq!(texts[0], responses::WORKING);
    assert_eq!(texts[1], "generated answer to: What does SLO stand for?");
    assert_eq!(
        texts[3],
        format!(
            "{}generated answer to: What does SLO stand for?",
            responses::FAST_HIT_PREFIX
        )
    );
}
