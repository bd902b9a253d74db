use thiserror::Error;

/// The embedding provider could not produce a vector.
///
/// This is the one failure that reaches the caller: without an embedding there is
/// nothing to match and nothing to cache.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub message: String,
    /// HTTP status reported by the provider, when there was a response at all.
    pub status_code: Option<u16>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// `true` for 429 responses.
    pub fn is_quota(&self) -> bool {
        self.status_code == Some(429)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "embedding provider error (status {}): {}", code, self.message),
            None => write!(f, "embedding provider error: {}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Error)]
/// Errors from the fast embedding cache or the durable embedding store.
pub enum StoreError {
    /// Could not reach the store.
    #[error("{store}: connection failed: {message}")]
    ConnectionFailed {
        /// Store name.
        store: &'static str,
        /// Error message.
        message: String,
    },

    /// Lookup failed.
    #[error("{store}: lookup failed: {message}")]
    LookupFailed {
        /// Store name.
        store: &'static str,
        /// Error message.
        message: String,
    },

    /// Write failed.
    #[error("{store}: write failed: {message}")]
    WriteFailed {
        /// Store name.
        store: &'static str,
        /// Error message.
        message: String,
    },

    /// Stored value could not be decoded into an embedding.
    #[error("{store}: corrupt entry: {message}")]
    Corrupt {
        /// Store name.
        store: &'static str,
        /// Error message.
        message: String,
    },

    /// The call did not complete within the configured bound.
    #[error("{store}: {operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Store name.
        store: &'static str,
        /// Operation label.
        operation: &'static str,
        /// Configured bound.
        timeout_ms: u64,
    },
}
