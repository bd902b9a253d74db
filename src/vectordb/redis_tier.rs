//! Fast tier: RediSearch vector index over Redis hashes.
//!
//! Score convention: the index is declared with `DISTANCE_METRIC COSINE`, for which
//! RediSearch reports a cosine *distance* in `[0, 2]` as `vector_score`. Candidates
//! carry `similarity = 1 - distance`.

use std::collections::HashMap;
use std::fmt;

use redis::aio::ConnectionManager;
use redis::{Client, Value};
use tracing::{debug, info, warn};

use super::error::{MalformedResultError, TierError};
use super::model::{MatchCandidate, QaEntry, TierKind, sort_by_score_desc};
use super::tier::{VectorTier, check_dimension, is_already_exists};
use crate::codec;

pub const DEFAULT_INDEX_NAME: &str = "idx:questions";
pub const DEFAULT_DOCUMENT_PREFIX: &str = "question:";

const VECTOR_FIELD: &str = "vector";
const SCORE_FIELD: &str = "vector_score";

#[derive(Debug, Clone)]
pub struct RedisTierConfig {
    pub index_name: String,
    /// Prefix for the hashes this index owns.
    pub prefix: String,
    pub dimension: usize,
}

impl Default for RedisTierConfig {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            prefix: DEFAULT_DOCUMENT_PREFIX.to_string(),
            dimension: crate::constants::DEFAULT_EMBEDDING_DIM,
        }
    }
}

/// RediSearch-backed fast tier.
#[derive(Clone)]
pub struct RedisTier {
    connection: ConnectionManager,
    config: RedisTierConfig,
}

impl fmt::Debug for RedisTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTier")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisTier {
    /// Opens a managed connection to `url`.
    pub async fn connect(url: &str, config: RedisTierConfig) -> Result<Self, TierError> {
        let connection = connect_manager(url).await?;
        Ok(Self::new(connection, config))
    }

    /// Wraps an existing connection (shared with the embedding cache).
    pub fn new(connection: ConnectionManager, config: RedisTierConfig) -> Self {
        Self { connection, config }
    }

    pub fn config(&self) -> &RedisTierConfig {
        &self.config
    }

    /// Returns a handle to the underlying connection.
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    /// Key under which an entry is stored.
    pub fn document_key(&self, id: &str) -> String {
        format!("{}{}", self.config.prefix, id)
    }

    fn index_error(&self, message: String) -> TierError {
        TierError::CreateIndexFailed {
            tier: TierKind::Fast,
            index: self.config.index_name.clone(),
            message,
        }
    }
}

/// Opens a [`ConnectionManager`] for `url`.
pub async fn connect_manager(url: &str) -> Result<ConnectionManager, TierError> {
    let client = Client::open(url).map_err(|e| TierError::ConnectionFailed {
        tier: TierKind::Fast,
        url: url.to_string(),
        message: e.to_string(),
    })?;

    ConnectionManager::new(client)
        .await
        .map_err(|e| TierError::ConnectionFailed {
            tier: TierKind::Fast,
            url: url.to_string(),
            message: e.to_string(),
        })
}

/// `FT.CREATE` for a FLAT FLOAT32 cosine index over hashes under `prefix`.
pub fn create_index_command(config: &RedisTierConfig) -> redis::Cmd {
    let mut cmd = redis::cmd("FT.CREATE");
    cmd.arg(&config.index_name)
        .arg("ON")
        .arg("HASH")
        .arg("PREFIX")
        .arg(1)
        .arg(&config.prefix)
        .arg("SCHEMA")
        .arg(VECTOR_FIELD)
        .arg("VECTOR")
        .arg("FLAT")
        .arg(6)
        .arg("TYPE")
        .arg("FLOAT32")
        .arg("DIM")
        .arg(config.dimension)
        .arg("DISTANCE_METRIC")
        .arg("COSINE")
        .arg("text")
        .arg("TEXT")
        .arg("response")
        .arg("TEXT");
    cmd
}

/// `FT.SEARCH` KNN query; the vector travels as a binary `$BLOB` parameter.
pub fn knn_command(index_name: &str, query: &[f32], k: usize) -> redis::Cmd {
    let blob = codec::encode(query);
    let mut cmd = redis::cmd("FT.SEARCH");
    cmd.arg(index_name)
        .arg(format!("*=>[KNN {} @{} $BLOB AS {}]", k, VECTOR_FIELD, SCORE_FIELD))
        .arg("PARAMS")
        .arg(2)
        .arg("BLOB")
        .arg(blob.as_slice())
        .arg("RETURN")
        .arg(3)
        .arg("text")
        .arg("response")
        .arg(SCORE_FIELD)
        .arg("SORTBY")
        .arg(SCORE_FIELD)
        .arg("DIALECT")
        .arg(2);
    cmd
}

/// Normalizes an `FT.SEARCH` reply into candidates.
///
/// The RESP2 reply is `[total, key1, [field, value, ...], key2, [...], ...]`.
/// Documents with a missing response or an unparsable or non-finite score are dropped.
pub fn parse_search_reply(reply: &Value) -> Vec<MatchCandidate> {
    let items = match reply {
        Value::Array(items) => items,
        Value::Nil => return Vec::new(),
        other => {
            warn!(tier = %TierKind::Fast, reply = ?other, "Unexpected FT.SEARCH reply shape");
            return Vec::new();
        }
    };

    let mut candidates = Vec::with_capacity(items.len() / 2);
    // items[0] is the total match count.
    let mut rest = items.iter().skip(1);
    while let Some(key_value) = rest.next() {
        let key = value_to_string(key_value).unwrap_or_else(|| "<unknown>".to_string());
        let Some(fields_value) = rest.next() else {
            let err = MalformedResultError::new(TierKind::Fast, key, "missing field list");
            warn!(error = %err, "Skipping search result");
            break;
        };

        match parse_document(&key, fields_value) {
            Ok(candidate) => candidates.push(candidate),
            Err(err) => warn!(error = %err, "Skipping search result"),
        }
    }

    sort_by_score_desc(&mut candidates);
    candidates
}

fn parse_document(key: &str, fields_value: &Value) -> Result<MatchCandidate, MalformedResultError> {
    let fields = field_map(fields_value).ok_or_else(|| {
        MalformedResultError::new(TierKind::Fast, key, "field list is not an array")
    })?;

    let response = fields
        .get("response")
        .filter(|r| !r.is_empty())
        .ok_or_else(|| MalformedResultError::new(TierKind::Fast, key, "missing response"))?;

    let distance: f32 = fields
        .get(SCORE_FIELD)
        .ok_or_else(|| MalformedResultError::new(TierKind::Fast, key, "missing vector_score"))?
        .parse()
        .map_err(|_| MalformedResultError::new(TierKind::Fast, key, "unparsable vector_score"))?;

    let similarity = 1.0 - distance;
    if !similarity.is_finite() {
        return Err(MalformedResultError::new(TierKind::Fast, key, "non-finite vector_score"));
    }

    let mut candidate = MatchCandidate::new(response.clone(), similarity);
    if let Some(question) = fields.get("text") {
        candidate = candidate.with_question(question.clone());
    }
    Ok(candidate)
}

fn field_map(value: &Value) -> Option<HashMap<String, String>> {
    match value {
        Value::Array(flat) => {
            let mut map = HashMap::with_capacity(flat.len() / 2);
            for pair in flat.chunks(2) {
                if let [name, val] = pair {
                    if let (Some(name), Some(val)) = (value_to_string(name), value_to_string(val)) {
                        map.insert(name, val);
                    }
                }
            }
            Some(map)
        }
        Value::Map(pairs) => Some(
            pairs
                .iter()
                .filter_map(|(k, v)| Some((value_to_string(k)?, value_to_string(v)?)))
                .collect(),
        ),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    redis::from_redis_value::<String>(value).ok()
}

impl VectorTier for RedisTier {
    fn kind(&self) -> TierKind {
        TierKind::Fast
    }

    fn name(&self) -> &str {
        &self.config.index_name
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn is_ready(&self) -> bool {
        let mut conn = self.connection.clone();
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                warn!(tier = %TierKind::Fast, error = %e, "Redis health check failed");
                false
            }
        }
    }

    async fn ensure_index(&self) -> Result<(), TierError> {
        let mut conn = self.connection.clone();
        let result: Result<(), redis::RedisError> = create_index_command(&self.config)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => {
                info!(index = %self.config.index_name, "Vector index created");
                Ok(())
            }
            Err(e) if is_already_exists(&e.to_string()) => {
                debug!(index = %self.config.index_name, "Vector index already exists");
                Ok(())
            }
            Err(e) => Err(self.index_error(e.to_string())),
        }
    }

    async fn upsert(&self, entry: &QaEntry) -> Result<String, TierError> {
        check_dimension(TierKind::Fast, self.config.dimension, entry.embedding.dim())?;

        let key = self.document_key(&entry.id);
        let blob = entry.embedding.to_bytes();
        let mut conn = self.connection.clone();

        let _: () = redis::cmd("HSET")
            .arg(&key)
            .arg(VECTOR_FIELD)
            .arg(blob.as_slice())
            .arg("text")
            .arg(&entry.question)
            .arg("response")
            .arg(&entry.response)
            .arg("timestamp")
            .arg(entry.created_at.to_rfc3339())
            .query_async(&mut conn)
            .await
            .map_err(|e| TierError::UpsertFailed {
                tier: TierKind::Fast,
                index: self.config.index_name.clone(),
                message: e.to_string(),
            })?;

        debug!(key = %key, "Stored question vector");
        Ok(key)
    }

    async fn knn(&self, query: &[f32], k: usize) -> Result<Vec<MatchCandidate>, TierError> {
        check_dimension(TierKind::Fast, self.config.dimension, query.len())?;

        let mut conn = self.connection.clone();
        let reply: Value = knn_command(&self.config.index_name, query, k)
            .query_async(&mut conn)
            .await
            .map_err(|e| TierError::SearchFailed {
                tier: TierKind::Fast,
                index: self.config.index_name.clone(),
                message: e.to_string(),
            })?;

        let mut candidates = parse_search_reply(&reply);
        candidates.truncate(k);
        Ok(candidates)
    }
}
