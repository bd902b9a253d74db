use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::chat::{AnswerGenerator, DEFAULT_CHAT_MODEL};
use super::error::GenerationError;

/// Canned-answer generator that records its inputs.
#[derive(Default)]
pub struct MockGenerator {
    answer: Mutex<Option<String>>,
    fail: AtomicBool,
    questions: Mutex<Vec<String>>,
    transcripts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every question with `answer` instead of an echo.
    pub fn with_answer(answer: impl Into<String>) -> Self {
        let generator = Self::default();
        *generator.answer.lock().expect("lock poisoned") = Some(answer.into());
        generator
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().expect("lock poisoned").clone()
    }

    pub fn transcripts(&self) -> Vec<String> {
        self.transcripts.lock().expect("lock poisoned").clone()
    }

    fn check_failure(&self) -> Result<(), GenerationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GenerationError::RequestFailed {
                model: DEFAULT_CHAT_MODEL.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AnswerGenerator for MockGenerator {
    async fn generate_response(&self, question: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.questions
            .lock()
            .expect("lock poisoned")
            .push(question.to_string());
        self.check_failure()?;

        let canned = self.answer.lock().expect("lock poisoned").clone();
        Ok(canned.unwrap_or_else(|| format!("generated answer to: {}", question)))
    }

    async fn generate_summary(&self, transcript: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.transcripts
            .lock()
            .expect("lock poisoned")
            .push(transcript.to_string());
        self.check_failure()?;

        Ok(format!("summary of {} lines", transcript.lines().count()))
    }
}
