//! Tiered index client: one contract over the fast (Redis) and durable (Qdrant)
//! vector indices.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod qdrant_tier;
pub mod redis_tier;
pub mod tier;


pub use error::{MalformedResultError, TierError};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockVectorTier, cosine_similarity};
pub use model::{MatchCandidate, QaEntry, TierKind, generate_entry_id, sort_by_score_desc};
pub use qdrant_tier::{DEFAULT_COLLECTION_NAME, QA_PAIR_TYPE, QdrantTier, QdrantTierConfig};
pub use redis_tier::{DEFAULT_DOCUMENT_PREFIX, DEFAULT_INDEX_NAME, RedisTier, RedisTierConfig};
pub use tier::{VectorTier, is_already_exists, with_deadline};
