//! Durable tier: managed Qdrant collection.
//!
//! Score convention: the collection uses `Distance::Cosine`, for which Qdrant reports
//! cosine *similarity* directly. Scores are passed through unchanged.

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, ScoredPoint,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use tracing::{debug, info, warn};

use super::error::{MalformedResultError, TierError};
use super::model::{MatchCandidate, QaEntry, TierKind, sort_by_score_desc};
use super::tier::{VectorTier, check_dimension, is_already_exists};

pub const DEFAULT_COLLECTION_NAME: &str = "recall_qa";

/// Payload discriminator; searches only consider points of this type.
pub const QA_PAIR_TYPE: &str = "qa_pair";

#[derive(Debug, Clone)]
pub struct QdrantTierConfig {
    pub collection: String,
    pub dimension: usize,
}

impl Default for QdrantTierConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION_NAME.to_string(),
            dimension: crate::constants::DEFAULT_EMBEDDING_DIM,
        }
    }
}

#[derive(Clone)]
/// Qdrant-backed durable tier.
pub struct QdrantTier {
    client: Qdrant,
    url: String,
    config: QdrantTierConfig,
}

impl std::fmt::Debug for QdrantTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantTier")
            .field("url", &self.url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QdrantTier {
    /// Creates a client for `url`; `api_key` is required by managed deployments.
    pub fn connect(
        url: &str,
        api_key: Option<&str>,
        config: QdrantTierConfig,
    ) -> Result<Self, TierError> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }

        let client = builder.build().map_err(|e| TierError::ConnectionFailed {
            tier: TierKind::Durable,
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            url: url.to_string(),
            config,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &QdrantTierConfig {
        &self.config
    }
}

/// Converts a scored point into a candidate.
pub fn candidate_from_scored_point(point: ScoredPoint) -> Result<MatchCandidate, MalformedResultError> {
    let document = point
        .id
        .as_ref()
        .and_then(|id| id.point_id_options.as_ref())
        .map(|id| format!("{:?}", id))
        .unwrap_or_else(|| "<unknown>".to_string());

    let payload = point.payload;

    let response = payload
        .get("response")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MalformedResultError::new(TierKind::Durable, &document, "missing response"))?;

    let question = payload
        .get("question")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MalformedResultError::new(TierKind::Durable, &document, "missing question"))?;

    if !point.score.is_finite() {
        return Err(MalformedResultError::new(
            TierKind::Durable,
            &document,
            "non-finite score",
        ));
    }

    Ok(MatchCandidate::new(response.to_string(), point.score).with_question(question.to_string()))
}

impl VectorTier for QdrantTier {
    fn kind(&self) -> TierKind {
        TierKind::Durable
    }

    fn name(&self) -> &str {
        &self.config.collection
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn is_ready(&self) -> bool {
        match self.client.health_check().await {
            Ok(_) => true,
            Err(e) => {
                warn!(tier = %TierKind::Durable, error = %e, "Qdrant health check failed");
                false
            }
        }
    }

    async fn ensure_index(&self) -> Result<(), TierError> {
        let vectors_config =
            VectorParamsBuilder::new(self.config.dimension as u64, Distance::Cosine);

        let result = self
            .client
            .create_collection(
                CreateCollectionBuilder::new(&self.config.collection)
                    .vectors_config(vectors_config)
                    .on_disk_payload(true),
            )
            .await;

        match result {
            Ok(_) => {
                info!(collection = %self.config.collection, "Collection created");
                Ok(())
            }
            Err(e) if is_already_exists(&e.to_string()) => {
                debug!(collection = %self.config.collection, "Collection already exists");
                Ok(())
            }
            Err(e) => Err(TierError::CreateIndexFailed {
                tier: TierKind::Durable,
                index: self.config.collection.clone(),
                message: e.to_string(),
            }),
        }
    }

    async fn upsert(&self, entry: &QaEntry) -> Result<String, TierError> {
        check_dimension(TierKind::Durable, self.config.dimension, entry.embedding.dim())?;

        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert("question".to_string(), entry.question.clone().into());
        payload.insert("response".to_string(), entry.response.clone().into());
        payload.insert("timestamp".to_string(), entry.created_at.to_rfc3339().into());
        payload.insert("type".to_string(), QA_PAIR_TYPE.into());

        let point = PointStruct::new(entry.id.clone(), entry.embedding.to_vec(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, vec![point]).wait(true))
            .await
            .map_err(|e| TierError::UpsertFailed {
                tier: TierKind::Durable,
                index: self.config.collection.clone(),
                message: e.to_string(),
            })?;

        debug!(point_id = %entry.id, "Stored Q&A pair");
        Ok(entry.id.clone())
    }

    async fn knn(&self, query: &[f32], k: usize) -> Result<Vec<MatchCandidate>, TierError> {
        check_dimension(TierKind::Durable, self.config.dimension, query.len())?;

        let filter = Filter::must([Condition::matches("type", QA_PAIR_TYPE.to_string())]);
        let search = SearchPointsBuilder::new(&self.config.collection, query.to_vec(), k as u64)
            .with_payload(true)
            .filter(filter);

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| TierError::SearchFailed {
                tier: TierKind::Durable,
                index: self.config.collection.clone(),
                message: e.to_string(),
            })?;

        let mut candidates: Vec<MatchCandidate> = response
            .result
            .into_iter()
            .filter_map(|point| match candidate_from_scored_point(point) {
                Ok(candidate) => Some(candidate),
                Err(err) => {
                    warn!(error = %err, "Skipping search result");
                    None
                }
            })
            .collect();

        sort_by_score_desc(&mut candidates);
        Ok(candidates)
    }
}
