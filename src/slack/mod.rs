//! Slack transport: Web API client, Events API payloads and request signing.

pub mod client;
pub mod events;
pub mod signature;

pub use client::{DEFAULT_SLACK_API_URL, SlackClient};
pub use events::{EventEnvelope, SlackEvent};
pub use signature::{
    MAX_CLOCK_SKEW_SECS, SIGNATURE_HEADER, SignatureError, TIMESTAMP_HEADER, sign,
    verify_signature,
};
