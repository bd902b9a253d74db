use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::bot::{Transport, TransportError};

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Slack Web API client.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    auth_header: String,
    base_url: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepliesResponse {
    #[serde(default)]
    messages: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    #[serde(default)]
    text: String,
}

impl SlackClient {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self, TransportError> {
        Self::with_base_url(bot_token, DEFAULT_SLACK_API_URL, timeout)
    }

    pub fn with_base_url(
        bot_token: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Http {
                method: "client",
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            auth_header: format!("Bearer {}", bot_token),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn read<T: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| TransportError::Decode {
                    method,
                    message: e.to_string(),
                })?;
        parse_api_response(method, body)
    }
}

/// Decodes a Web API body, turning `ok: false` into [`TransportError::Api`].
pub(crate) fn parse_api_response<T: DeserializeOwned>(
    method: &'static str,
    body: serde_json::Value,
) -> Result<T, TransportError> {
    let status: ApiStatus =
        serde_json::from_value(body.clone()).map_err(|e| TransportError::Decode {
            method,
            message: e.to_string(),
        })?;

    if !status.ok {
        return Err(TransportError::Api {
            method,
            error: status.error.unwrap_or_else(|| "unknown_error".to_string()),
        });
    }

    serde_json::from_value(body).map_err(|e| TransportError::Decode {
        method,
        message: e.to_string(),
    })
}

fn http_error(method: &'static str, e: reqwest::Error) -> TransportError {
    TransportError::Http {
        method,
        message: e.to_string(),
    }
}

#[async_trait]
impl Transport for SlackClient {
    async fn say(&self, channel: &str, thread_ts: &str, text: &str) -> Result<(), TransportError> {
        const METHOD: &str = "chat.postMessage";
        let response = self
            .http
            .post(self.url(METHOD))
            .header("Authorization", &self.auth_header)
            .json(&serde_json::json!({
                "channel": channel,
                "thread_ts": thread_ts,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| http_error(METHOD, e))?;

        let _: serde_json::Value = Self::read(METHOD, response).await?;
        debug!(channel = %channel, thread_ts = %thread_ts, "Posted reply");
        Ok(())
    }

    async fn thread_messages(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<String>, TransportError> {
        const METHOD: &str = "conversations.replies";
        let response = self
            .http
            .get(self.url(METHOD))
            .header("Authorization", &self.auth_header)
            .query(&[("channel", channel), ("ts", thread_ts)])
            .send()
            .await
            .map_err(|e| http_error(METHOD, e))?;

        let replies: RepliesResponse = Self::read(METHOD, response).await?;
        Ok(replies.messages.into_iter().map(|m| m.text).collect())
    }

    async fn is_healthy(&self) -> bool {
        const METHOD: &str = "auth.test";
        let result = match self
            .http
            .post(self.url(METHOD))
            .header("Authorization", &self.auth_header)
            .send()
            .await
        {
            Ok(response) => Self::read::<serde_json::Value>(METHOD, response)
                .await
                .map(|_| ()),
            Err(e) => Err(http_error(METHOD, e)),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Slack health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_false_is_api_error() {
        let err = parse_api_response::<serde_json::Value>(
            "chat.postMessage",
            serde_json::json!({ "ok": false, "error": "channel_not_found" }),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            TransportError::Api { method: "chat.postMessage", ref error } if error == "channel_not_found"
        ));
        assert_eq!(
            err.to_string(),
            "chat.postMessage: API error: channel_not_found"
        );
    }

    #[test]
    fn test_replies_are_decoded() {
        let replies: RepliesResponse = parse_api_response(
            "conversations.replies",
            serde_json::json!({
                "ok": true,
                "messages": [
                    { "type": "message", "text": "first", "ts": "1.0" },
                    { "type": "message", "ts": "1.1" },
                    { "type": "message", "text": "third", "ts": "1.2" }
                ],
                "has_more": false
            }),
        )
        .unwrap();

        let texts: Vec<String> = replies.messages.into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["first", "", "third"]);
    }

    #[test]
    fn test_missing_ok_is_decode_error() {
        let err =
            parse_api_response::<serde_json::Value>("auth.test", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }

    #[test]
    fn test_urls() {
        let client =
            SlackClient::with_base_url("xoxb-test", "http://localhost:9999/api/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.url("auth.test"), "http://localhost:9999/api/auth.test");
    }
}
