use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned while talking to the chat platform.
pub enum TransportError {
    /// The HTTP request itself failed.
    #[error("{method}: request failed: {message}")]
    Http {
        /// API method.
        method: &'static str,
        /// Error message.
        message: String,
    },

    /// The platform answered with `ok: false`.
    #[error("{method}: API error: {error}")]
    Api {
        /// API method.
        method: &'static str,
        /// Platform error code.
        error: String,
    },

    /// The response body could not be decoded.
    #[error("{method}: invalid response: {message}")]
    Decode {
        /// API method.
        method: &'static str,
        /// Error message.
        message: String,
    },
}
