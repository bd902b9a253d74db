//! Recall library crate (used by the server binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Cache Core
//! - [`EmbeddingResolver`] - text to embedding, via fast cache, durable store, provider
//! - [`SimilarityCascade`] - fast tier first, durable tier second, strict threshold
//! - [`WriteBackCoordinator`] - records fresh answers into both tiers
//! - [`AnswerPipeline`] - resolve, look up, generate on miss
//!
//! ## Backends
//! - [`RedisTier`], [`QdrantTier`] - the two [`VectorTier`] implementations
//! - [`RedisEmbeddingCache`], [`MongoEmbeddingStore`] - embedding persistence
//! - [`OpenAiEmbedder`], [`GenaiGenerator`] - model providers
//!
//! ## Chat Surface
//! - [`Bot`], [`Dispatcher`] - intent dispatch for incoming messages
//! - [`SlackClient`] - Web API transport
//! - [`server`] - Events API intake and health endpoints
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod bot;
pub mod cache;
pub mod codec;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod generation;
pub mod server;
pub mod slack;
pub mod vectordb;

pub use bot::{Bot, Dispatcher, HandleOutcome, IncomingMessage, Transport, TransportError};
#[cfg(any(test, feature = "mock"))]
pub use bot::MockTransport;

#[cfg(any(test, feature = "mock"))]
pub use cache::MockSimilarityCascade;
pub use cache::{
    Answer, AnswerError, AnswerPipeline, CacheStatus, CascadeConfig, CascadeConfigError,
    CascadeResult, QuestionAnswerer, SimilarityCascade, WriteBackCoordinator, WriteBackReport,
};

pub use codec::{CodecError, decode, decode_with_dim, encode};
pub use config::{Config, ConfigError};
pub use constants::{DimValidationError, validate_embedding_dim};

#[cfg(any(test, feature = "mock"))]
pub use embedding::{MockEmbeddingProvider, MockEmbeddingStore, derive_embedding};
pub use embedding::{
    Embedding, EmbeddingProvider, EmbeddingResolver, EmbeddingStore, MongoEmbeddingStore,
    OpenAiEmbedder, OpenAiEmbedderConfig, ProviderError, RedisEmbeddingCache, StoreError,
};

#[cfg(any(test, feature = "mock"))]
pub use generation::MockGenerator;
pub use generation::{AnswerGenerator, GenaiGenerator, GenerationError};

pub use server::{AppState, ServerError, create_router_with_state};
pub use slack::SlackClient;

#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockVectorTier;
pub use vectordb::{
    MalformedResultError, MatchCandidate, QaEntry, QdrantTier, RedisTier, TierError, TierKind,
    VectorTier,
};
