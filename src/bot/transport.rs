use async_trait::async_trait;

use super::error::TransportError;

/// Delivery side of the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `text` into the thread rooted at `thread_ts`.
    async fn say(&self, channel: &str, thread_ts: &str, text: &str) -> Result<(), TransportError>;

    /// Texts of every message in a thread, oldest first.
    async fn thread_messages(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<String>, TransportError>;

    /// Returns `true` if the platform accepts this bot's credentials.
    async fn is_healthy(&self) -> bool;
}
