use std::future::Future;
use std::time::Duration;

use mongodb::bson::{self, Bson, Document, doc};
use mongodb::options::{IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};

use super::error::StoreError;
use super::types::Embedding;
use crate::constants::EMBEDDING_CACHE_PREFIX;

/// Text-keyed embedding storage (the fast cache and the durable store).
///
/// Keys are the exact source text; no normalization is applied.
pub trait EmbeddingStore: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn get(&self, text: &str)
    -> impl Future<Output = Result<Option<Embedding>, StoreError>> + Send;

    fn put(
        &self,
        text: &str,
        embedding: &Embedding,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns `true` if the backend answers a basic health probe.
    fn is_healthy(&self) -> impl Future<Output = bool> + Send;
}

// ---------------------------------------------------------------------------
// Redis fast cache
// ---------------------------------------------------------------------------

/// Fast embedding cache: Redis string `embedding:<text>` holding the codec blob.
#[derive(Clone)]
pub struct RedisEmbeddingCache {
    connection: ConnectionManager,
    dimension: usize,
}

impl std::fmt::Debug for RedisEmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEmbeddingCache")
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl RedisEmbeddingCache {
    const NAME: &'static str = "redis-embedding-cache";

    /// Blobs that do not decode to `dimension` components read as corrupt.
    pub fn new(connection: ConnectionManager, dimension: usize) -> Self {
        Self {
            connection,
            dimension,
        }
    }

    pub fn cache_key(text: &str) -> String {
        format!("{}{}", EMBEDDING_CACHE_PREFIX, text)
    }
}

impl EmbeddingStore for RedisEmbeddingCache {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn get(&self, text: &str) -> Result<Option<Embedding>, StoreError> {
        let mut conn = self.connection.clone();
        let blob: Option<Vec<u8>> = redis::cmd("GET")
            .arg(Self::cache_key(text))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::LookupFailed {
                store: Self::NAME,
                message: e.to_string(),
            })?;

        blob.map(|bytes| {
            Embedding::from_bytes_with_dim(&bytes, self.dimension).map_err(|e| {
                StoreError::Corrupt {
                    store: Self::NAME,
                    message: e.to_string(),
                }
            })
        })
        .transpose()
    }

    async fn put(&self, text: &str, embedding: &Embedding) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let blob = embedding.to_bytes();
        let _: () = redis::cmd("SET")
            .arg(Self::cache_key(text))
            .arg(blob.as_slice())
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::WriteFailed {
                store: Self::NAME,
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        let mut conn = self.connection.clone();
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.map(|reply| reply == "PONG").unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// MongoDB durable store
// ---------------------------------------------------------------------------

pub const EMBEDDINGS_COLLECTION: &str = "embeddings";

/// Durable embedding store: MongoDB `embeddings` collection keyed by `text`.
#[derive(Clone)]
pub struct MongoEmbeddingStore {
    database: Database,
    collection: Collection<Document>,
    dimension: usize,
    ttl: Duration,
}

impl std::fmt::Debug for MongoEmbeddingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoEmbeddingStore")
            .field("database", &self.database.name())
            .field("dimension", &self.dimension)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl MongoEmbeddingStore {
    const NAME: &'static str = "mongo-embedding-store";

    /// Parses `uri` and builds a client; the driver connects lazily.
    pub async fn connect(
        uri: &str,
        database: &str,
        dimension: usize,
        ttl: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                store: Self::NAME,
                message: e.to_string(),
            })?;

        let database = client.database(database);
        let collection = database.collection::<Document>(EMBEDDINGS_COLLECTION);

        Ok(Self {
            database,
            collection,
            dimension,
            ttl,
        })
    }

    /// Creates the unique `text` index and the `createdAt` TTL index.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique_text = IndexModel::builder()
            .keys(doc! { "text": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let ttl = IndexModel::builder()
            .keys(doc! { "createdAt": 1 })
            .options(IndexOptions::builder().expire_after(self.ttl).build())
            .build();

        for index in [unique_text, ttl] {
            match self.collection.create_index(index, None).await {
                Ok(_) => {}
                Err(e) if crate::vectordb::is_already_exists(&e.to_string()) => {
                    debug!(error = %e, "Embedding index already exists");
                }
                Err(e) => {
                    return Err(StoreError::ConnectionFailed {
                        store: Self::NAME,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            collection = EMBEDDINGS_COLLECTION,
            ttl_secs = self.ttl.as_secs(),
            "Embedding store indexes ready"
        );
        Ok(())
    }
}

/// Reads the `embedding` array of a stored document, which must hold `dimension` components.
pub fn embedding_from_document(
    document: &Document,
    dimension: usize,
) -> Result<Embedding, StoreError> {
    let corrupt = |message: String| StoreError::Corrupt {
        store: MongoEmbeddingStore::NAME,
        message,
    };

    let array = document
        .get_array("embedding")
        .map_err(|e| corrupt(e.to_string()))?;

    let values = array
        .iter()
        .map(|value| match value {
            Bson::Double(v) => Ok(*v as f32),
            Bson::Int32(v) => Ok(*v as f32),
            Bson::Int64(v) => Ok(*v as f32),
            other => Err(corrupt(format!(
                "non-numeric component: {:?}",
                other.element_type()
            ))),
        })
        .collect::<Result<Vec<f32>, _>>()?;

    if values.len() != dimension {
        return Err(corrupt(format!(
            "expected {} components, found {}",
            dimension,
            values.len()
        )));
    }

    Ok(Embedding::new(values))
}

impl EmbeddingStore for MongoEmbeddingStore {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn get(&self, text: &str) -> Result<Option<Embedding>, StoreError> {
        let found = self
            .collection
            .find_one(doc! { "text": text }, None)
            .await
            .map_err(|e| StoreError::LookupFailed {
                store: Self::NAME,
                message: e.to_string(),
            })?;

        found
            .as_ref()
            .map(|document| embedding_from_document(document, self.dimension))
            .transpose()
    }

    async fn put(&self, text: &str, embedding: &Embedding) -> Result<(), StoreError> {
        let values: Vec<f64> = embedding.iter().map(|&v| f64::from(v)).collect();
        let now = bson::DateTime::now();

        self.collection
            .update_one(
                doc! { "text": text },
                doc! {
                    "$set": { "embedding": values, "updatedAt": now },
                    "$setOnInsert": { "createdAt": now },
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| StoreError::WriteFailed {
                store: Self::NAME,
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        match self.database.run_command(doc! { "ping": 1 }, None).await {
            Ok(_) => true,
            Err(e) => {
                warn!(store = Self::NAME, error = %e, "MongoDB health check failed");
                false
            }
        }
    }
}
