//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A required environment variable was not set (or was blank).
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },

    /// A numeric variable could not be parsed.
    #[error("invalid value '{value}' for {name}: expected a number")]
    InvalidNumber { name: &'static str, value: String },

    /// A boolean variable was not one of true/false/1/0/yes/no.
    #[error("invalid value '{value}' for {name}: expected a boolean")]
    InvalidBool { name: &'static str, value: String },

    /// Match threshold outside the cosine similarity range.
    #[error("match threshold {value} is outside [-1, 1]")]
    ThresholdOutOfRange { value: f32 },

    /// A count or duration that must be positive was zero.
    #[error("{name} must be greater than zero")]
    ZeroValue { name: &'static str },
}
