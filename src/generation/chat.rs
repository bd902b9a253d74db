use std::time::Duration;

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use tracing::{debug, instrument};

use super::error::GenerationError;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4-turbo";

pub const SYSTEM_PROMPT: &str = "You are a senior Site Reliability Engineer (SRE) with 10+ years of experience in cloud infrastructure, DevOps practices, and system architecture. Your expertise includes:
• Cloud platforms (AWS, GCP, Azure)
• Kubernetes and container orchestration
• Infrastructure as Code (Terraform, CloudFormation)
• Monitoring and observability (Prometheus, Grafana, ELK)
• CI/CD pipelines and automation
• Performance optimization and scalability
• Incident response and troubleshooting

Be concise but friendly in your responses. Try to make the response as short as possible";

pub const SUMMARY_PROMPT_PREFIX: &str = "Please summarize this conversation:\n";

/// Produces fresh answers and thread summaries.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate_response(&self, question: &str) -> Result<String, GenerationError>;

    async fn generate_summary(&self, transcript: &str) -> Result<String, GenerationError>;
}

/// [`AnswerGenerator`] backed by a `genai` client.
#[derive(Clone)]
pub struct GenaiGenerator {
    client: Client,
    model: String,
    timeout: Duration,
}

impl std::fmt::Debug for GenaiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiGenerator")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GenaiGenerator {
    /// Uses `Client::default()`, which reads provider keys from the environment.
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(Client::default(), model, timeout)
    }

    pub fn with_client(client: Client, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            model: model.into(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, GenerationError> {
        let call = self.client.exec_chat(&self.model, request, None);
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GenerationError::Timeout {
                model: self.model.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|e| GenerationError::RequestFailed {
                model: self.model.clone(),
                message: e.to_string(),
            })?;

        let text = response
            .first_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GenerationError::EmptyResponse {
                model: self.model.clone(),
            })?;

        Ok(text.to_string())
    }
}

/// Chat request for answering `question` under the SRE persona.
pub fn response_request(question: &str) -> ChatRequest {
    ChatRequest::new(vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(question),
    ])
}

/// Chat request for summarizing a newline-joined thread transcript.
pub fn summary_request(transcript: &str) -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::user(format!(
        "{}{}",
        SUMMARY_PROMPT_PREFIX, transcript
    ))])
}

#[async_trait]
impl AnswerGenerator for GenaiGenerator {
    #[instrument(skip(self, question), fields(model = %self.model, question_len = question.len()))]
    async fn generate_response(&self, question: &str) -> Result<String, GenerationError> {
        let answer = self.complete(response_request(question)).await?;
        debug!(answer_len = answer.len(), "Generated answer");
        Ok(answer)
    }

    #[instrument(skip(self, transcript), fields(model = %self.model, transcript_len = transcript.len()))]
    async fn generate_summary(&self, transcript: &str) -> Result<String, GenerationError> {
        let summary = self.complete(summary_request(transcript)).await?;
        debug!(summary_len = summary.len(), "Generated summary");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_request_has_system_then_user() {
        let request = response_request("What is Redis?");
        assert_eq!(request.messages.len(), 2);
        assert!(format!("{:?}", request.messages[0].role).contains("System"));
        assert!(format!("{:?}", request.messages[1].role).contains("User"));
    }

    #[test]
    fn test_summary_request_prefixes_transcript() {
        let request = summary_request("a\nb");
        assert_eq!(request.messages.len(), 1);
        let content = format!("{:?}", request.messages[0].content);
        assert!(content.contains("Please summarize this conversation:"));
    }

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::EmptyResponse {
            model: DEFAULT_CHAT_MODEL.to_string(),
        };
        assert_eq!(
            err.to_string(),
            "chat completion with 'gpt-4-turbo' returned no content"
        );
    }
}
