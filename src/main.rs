//! Recall HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use recall::bot::{Bot, Dispatcher, Transport};
use recall::cache::{AnswerPipeline, QuestionAnswerer, SimilarityCascade, WriteBackCoordinator};
use recall::config::Config;
use recall::constants::DEFAULT_GENERATION_TIMEOUT_SECS;
use recall::embedding::{
    EmbeddingResolver, MongoEmbeddingStore, OpenAiEmbedder, OpenAiEmbedderConfig,
    RedisEmbeddingCache,
};
use recall::generation::{AnswerGenerator, GenaiGenerator};
use recall::server::{
    AppState, HealthProbe, StoreProbe, TierProbe, TransportProbe, create_router_with_state,
};
use recall::slack::SlackClient;
use recall::vectordb::redis_tier::connect_manager;
use recall::vectordb::{QdrantTier, QdrantTierConfig, RedisTier, RedisTierConfig, VectorTier};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check().await);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let cascade_config = config.cascade_config();
    cascade_config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        threshold = config.match_threshold,
        dimension = config.embedding_dim,
        "Recall starting"
    );

    let bot_token = config
        .slack_bot_token
        .as_deref()
        .context("SLACK_BOT_TOKEN is required to serve Slack events")?;
    if config.slack_signing_secret.is_none() {
        tracing::warn!("No SLACK_SIGNING_SECRET configured, event signatures will not be checked");
    }

    let redis = connect_manager(&config.redis_url).await?;
    let fast = Arc::new(RedisTier::new(
        redis.clone(),
        RedisTierConfig {
            index_name: config.redis_index.clone(),
            prefix: config.redis_prefix.clone(),
            dimension: config.embedding_dim,
        },
    ));
    let durable = Arc::new(QdrantTier::connect(
        &config.qdrant_url,
        config.qdrant_api_key.as_deref(),
        QdrantTierConfig {
            collection: config.qdrant_collection.clone(),
            dimension: config.embedding_dim,
        },
    )?);

    fast.ensure_index().await?;
    durable.ensure_index().await?;
    tracing::info!(
        fast = fast.name(),
        durable = durable.name(),
        "Vector indexes ready"
    );

    let store = match &config.mongo_uri {
        Some(uri) => {
            let store = MongoEmbeddingStore::connect(
                uri,
                &config.mongo_db,
                config.embedding_dim,
                config.embedding_ttl(),
            )
            .await?;
            store.ensure_indexes().await?;
            tracing::info!(database = %config.mongo_db, "Durable embedding store ready");
            Some(Arc::new(store))
        }
        None => {
            tracing::warn!("No RECALL_MONGO_URI configured, durable embedding store disabled");
            None
        }
    };

    let embedder = OpenAiEmbedder::new(
        &config.openai_api_key,
        OpenAiEmbedderConfig {
            base_url: config.openai_base_url.clone(),
            model: config.embedding_model.clone(),
            dimension: config.embedding_dim,
            timeout: config.call_timeout(),
        },
    )?;
    let resolver = EmbeddingResolver::new(
        Arc::new(embedder),
        Arc::new(RedisEmbeddingCache::new(redis, config.embedding_dim)),
        store.clone(),
        config.embedding_dim,
        config.call_timeout(),
    );

    let generator: Arc<dyn AnswerGenerator> = Arc::new(GenaiGenerator::new(
        config.chat_model.clone(),
        Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
    ));

    let pipeline = AnswerPipeline::new(
        resolver,
        SimilarityCascade::new(Arc::clone(&fast), Arc::clone(&durable), cascade_config),
        WriteBackCoordinator::new(Arc::clone(&fast), Arc::clone(&durable), config.call_timeout()),
        Arc::clone(&generator),
    );
    let answerer: Arc<dyn QuestionAnswerer> = Arc::new(pipeline);

    let transport: Arc<dyn Transport> =
        Arc::new(SlackClient::new(bot_token, config.call_timeout())?);
    let bot = Bot::new(
        Arc::clone(&transport),
        Dispatcher::standard(answerer, generator),
    );

    let mut probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(TransportProbe::new("slack", transport)),
        Arc::new(TierProbe::new("redis", fast)),
        Arc::new(TierProbe::new("qdrant", durable)),
    ];
    if let Some(store) = store {
        probes.push(Arc::new(StoreProbe::optional("mongo", store)));
    }

    let state = AppState::new(bot, config.slack_signing_secret.clone(), probes);
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Recall shutdown complete");
    Ok(())
}

async fn run_health_check() -> i32 {
    let port = std::env::var("RECALL_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);

    let url = format!("http://127.0.0.1:{}/api/up", port);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    {
        Ok(client) => client,
        Err(_) => return 1,
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
