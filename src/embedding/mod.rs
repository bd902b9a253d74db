//! Embedding resolution.
//!
//! - [`provider`] produces vectors ([`OpenAiEmbedder`]).
//! - [`store`] caches them by exact text: Redis for the fast cache, MongoDB for
//!   the durable store.
//! - [`resolver`] consults cache, store and provider in that order.

mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod provider;
pub mod resolver;
pub mod store;
mod types;

#[cfg(test)]
mod tests;

pub use error::{ProviderError, StoreError};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbeddingProvider, MockEmbeddingStore, derive_embedding};
pub use provider::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_OPENAI_BASE_URL, EmbeddingProvider, OpenAiEmbedder,
    OpenAiEmbedderConfig,
};
pub use resolver::EmbeddingResolver;
pub use store::{EMBEDDINGS_COLLECTION, EmbeddingStore, MongoEmbeddingStore, RedisEmbeddingCache};
pub use types::Embedding;
