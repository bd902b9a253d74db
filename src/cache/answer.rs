//! Question answering on top of the cache: resolve, look up, generate on miss.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::cascade::{CascadeResult, SimilarityCascade};
use super::error::AnswerError;
use super::types::CacheStatus;
use super::writeback::WriteBackCoordinator;
use crate::embedding::{EmbeddingProvider, EmbeddingResolver, EmbeddingStore};
use crate::generation::AnswerGenerator;
use crate::vectordb::VectorTier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub source: CacheStatus,
}

/// Anything that can answer a free-form question.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<Answer, AnswerError>;
}

/// The full read/write path for one question.
pub struct AnswerPipeline<P, C, S, F, D> {
    resolver: EmbeddingResolver<P, C, S>,
    cascade: SimilarityCascade<F, D>,
    writeback: WriteBackCoordinator<F, D>,
    generator: Arc<dyn AnswerGenerator>,
}

impl<P, C, S, F, D> std::fmt::Debug for AnswerPipeline<P, C, S, F, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerPipeline")
            .field("resolver", &self.resolver)
            .field("cascade", &self.cascade)
            .field("writeback", &self.writeback)
            .finish_non_exhaustive()
    }
}

impl<P, C, S, F, D> AnswerPipeline<P, C, S, F, D>
where
    P: EmbeddingProvider + 'static,
    C: EmbeddingStore + 'static,
    S: EmbeddingStore + 'static,
    F: VectorTier + 'static,
    D: VectorTier + 'static,
{
    pub fn new(
        resolver: EmbeddingResolver<P, C, S>,
        cascade: SimilarityCascade<F, D>,
        writeback: WriteBackCoordinator<F, D>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            resolver,
            cascade,
            writeback,
            generator,
        }
    }

    pub fn resolver(&self) -> &EmbeddingResolver<P, C, S> {
        &self.resolver
    }

    pub fn cascade(&self) -> &SimilarityCascade<F, D> {
        &self.cascade
    }

    pub fn writeback(&self) -> &WriteBackCoordinator<F, D> {
        &self.writeback
    }
}

#[async_trait]
impl<P, C, S, F, D> QuestionAnswerer for AnswerPipeline<P, C, S, F, D>
where
    P: EmbeddingProvider + 'static,
    C: EmbeddingStore + 'static,
    S: EmbeddingStore + 'static,
    F: VectorTier + 'static,
    D: VectorTier + 'static,
{
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        let embedding = self.resolver.resolve(question).await?;

        let result = self.cascade.lookup(question, &embedding).await;
        let source = result.status();
        if let CascadeResult::Hit { candidate, .. } = result {
            return Ok(Answer {
                text: candidate.response,
                source,
            });
        }

        let text = self.generator.generate_response(question).await?;
        info!(answer_len = text.len(), "Generated fresh answer, writing back");
        self.writeback
            .spawn_record_answer(question.to_string(), text.clone(), embedding);

        Ok(Answer {
            text,
            source: CacheStatus::Miss,
        })
    }
}
