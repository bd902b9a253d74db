use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the generative provider.
pub enum GenerationError {
    /// The chat completion call failed.
    #[error("chat completion with '{model}' failed: {message}")]
    RequestFailed {
        /// Model name.
        model: String,
        /// Error message.
        message: String,
    },

    /// The provider answered without any text.
    #[error("chat completion with '{model}' returned no content")]
    EmptyResponse {
        /// Model name.
        model: String,
    },

    /// The call did not complete within the configured bound.
    #[error("chat completion with '{model}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Model name.
        model: String,
        /// Configured bound.
        timeout_ms: u64,
    },
}
