//! Generative answers for cache misses and thread summaries.

pub mod chat;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use chat::{
    AnswerGenerator, DEFAULT_CHAT_MODEL, GenaiGenerator, SUMMARY_PROMPT_PREFIX, SYSTEM_PROMPT,
};
pub use error::GenerationError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockGenerator;
