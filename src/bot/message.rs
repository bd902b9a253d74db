use serde::{Deserialize, Serialize};

/// Subtype Slack sets on messages posted by bots (including this one).
pub const BOT_MESSAGE_SUBTYPE: &str = "bot_message";

/// A channel message or mention as delivered by the chat platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub channel: String,
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

impl IncomingMessage {
    /// Thread to reply in: the message's thread, or a new thread under it.
    pub fn reply_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn is_from_bot(&self) -> bool {
        self.subtype.as_deref() == Some(BOT_MESSAGE_SUBTYPE)
    }

    /// Messages without an author or text are not addressed to anyone.
    pub fn is_actionable(&self) -> bool {
        self.user.as_deref().is_some_and(|u| !u.is_empty())
            && self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}
