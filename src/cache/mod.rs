//! Tiered semantic answer cache: similarity cascade, write-back and the
//! question-answering pipeline built on them.

pub mod answer;
pub mod cascade;
mod error;
pub mod types;
pub mod writeback;


pub use answer::{Answer, AnswerPipeline, QuestionAnswerer};
#[cfg(any(test, feature = "mock"))]
pub use cascade::MockSimilarityCascade;
pub use cascade::{CascadeConfig, CascadeResult, SimilarityCascade};
pub use error::{AnswerError, CascadeConfigError};
pub use types::CacheStatus;
pub use writeback::{WriteBackCoordinator, WriteBackReport};
