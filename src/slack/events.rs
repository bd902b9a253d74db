//! Slack Events API payloads.

use serde::Deserialize;

use crate::bot::IncomingMessage;

/// Outer envelope of an Events API request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Sent once when the request URL is configured; echo `challenge` back.
    UrlVerification { challenge: String },
    EventCallback {
        event: SlackEvent,
        #[serde(default)]
        event_id: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    Message(IncomingMessage),
    AppMention(IncomingMessage),
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_verification() {
        let envelope: EventEnvelope = serde_json::from_str(
            r#"{"token":"t","challenge":"3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P","type":"url_verification"}"#,
        )
        .unwrap();
        assert_eq!(
            envelope,
            EventEnvelope::UrlVerification {
                challenge: "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P".to_string()
            }
        );
    }

    #[test]
    fn test_message_callback() {
        let envelope: EventEnvelope = serde_json::from_value(serde_json::json!({
            "type": "event_callback",
            "team_id": "T1",
            "event_id": "Ev1",
            "event": {
                "type": "message",
                "channel": "C1",
                "user": "U1",
                "text": "What is Redis?",
                "ts": "1700000000.000100",
                "thread_ts": "1699999999.000001"
            }
        }))
        .unwrap();

        let EventEnvelope::EventCallback { event, event_id } = envelope else {
            panic!("expected event callback");
        };
        assert_eq!(event_id.as_deref(), Some("Ev1"));
        let SlackEvent::Message(message) = event else {
            panic!("expected message event");
        };
        assert_eq!(message.reply_ts(), "1699999999.000001");
        assert_eq!(message.text(), "What is Redis?");
    }

    #[test]
    fn test_mention_and_unknown_events() {
        let mention: SlackEvent = serde_json::from_value(serde_json::json!({
            "type": "app_mention",
            "channel": "C1",
            "user": "U1",
            "text": "<@U0> hi",
            "ts": "1.0"
        }))
        .unwrap();
        assert!(matches!(mention, SlackEvent::AppMention(_)));

        let other: SlackEvent =
            serde_json::from_value(serde_json::json!({ "type": "reaction_added" })).unwrap();
        assert_eq!(other, SlackEvent::Other);

        let envelope: EventEnvelope =
            serde_json::from_value(serde_json::json!({ "type": "app_rate_limited" })).unwrap();
        assert_eq!(envelope, EventEnvelope::Unsupported);
    }
}
