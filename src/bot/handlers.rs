//! Intent handlers. The dispatcher picks the first one whose `can_handle` matches.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::error::TransportError;
use super::message::IncomingMessage;
use super::responses;
use super::transport::Transport;
use crate::cache::{CacheStatus, QuestionAnswerer};
use crate::generation::AnswerGenerator;

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &'static str;

    fn can_handle(&self, message: &IncomingMessage) -> bool;

    /// Replies to `message`. Only delivery failures escape.
    async fn handle(
        &self,
        message: &IncomingMessage,
        transport: &dyn Transport,
    ) -> Result<(), TransportError>;
}

pub struct HelpHandler;

#[async_trait]
impl MessageHandler for HelpHandler {
    fn name(&self) -> &'static str {
        "help"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        message.text().to_lowercase().contains(responses::HELP_COMMAND)
    }

    async fn handle(
        &self,
        message: &IncomingMessage,
        transport: &dyn Transport,
    ) -> Result<(), TransportError> {
        transport
            .say(&message.channel, message.reply_ts(), responses::HELP)
            .await
    }
}

pub struct SummarizeHandler {
    generator: Arc<dyn AnswerGenerator>,
}

impl SummarizeHandler {
    pub fn new(generator: Arc<dyn AnswerGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl MessageHandler for SummarizeHandler {
    fn name(&self) -> &'static str {
        "summarize"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        message
            .text()
            .to_lowercase()
            .contains(responses::SUMMARIZE_COMMAND)
    }

    async fn handle(
        &self,
        message: &IncomingMessage,
        transport: &dyn Transport,
    ) -> Result<(), TransportError> {
        let Some(thread_ts) = message.thread_ts.as_deref() else {
            return transport
                .say(&message.channel, &message.ts, responses::SUMMARIZE_NO_THREAD)
                .await;
        };

        let summary = match transport.thread_messages(&message.channel, thread_ts).await {
            Ok(lines) => self
                .generator
                .generate_summary(&lines.join("\n"))
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match summary {
            Ok(summary) => transport.say(&message.channel, thread_ts, &summary).await,
            Err(error) => {
                warn!(error = %error, "Summary failed");
                transport
                    .say(&message.channel, thread_ts, responses::SUMMARIZE_ERROR)
                    .await
            }
        }
    }
}

pub struct QuestionHandler {
    answerer: Arc<dyn QuestionAnswerer>,
}

impl QuestionHandler {
    pub fn new(answerer: Arc<dyn QuestionAnswerer>) -> Self {
        Self { answerer }
    }
}

/// Reply text for an answer, marking cache hits by tier.
pub fn format_answer(text: &str, source: CacheStatus) -> String {
    match source {
        CacheStatus::HitFast => format!("{}{}", responses::FAST_HIT_PREFIX, text),
        CacheStatus::HitDurable => format!("{}{}", responses::DURABLE_HIT_PREFIX, text),
        CacheStatus::Miss => text.to_string(),
    }
}

#[async_trait]
impl MessageHandler for QuestionHandler {
    fn name(&self) -> &'static str {
        "question"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        message.text().ends_with('?')
    }

    async fn handle(
        &self,
        message: &IncomingMessage,
        transport: &dyn Transport,
    ) -> Result<(), TransportError> {
        let reply = match self.answerer.answer(message.text()).await {
            Ok(answer) => {
                debug!(source = %answer.source, "Answered question");
                format_answer(&answer.text, answer.source)
            }
            Err(e) => {
                warn!(error = %e, "Question failed");
                responses::QUESTION_ERROR.to_string()
            }
        };

        transport
            .say(&message.channel, message.reply_ts(), &reply)
            .await
    }
}

pub struct GreetingHandler;

#[async_trait]
impl MessageHandler for GreetingHandler {
    fn name(&self) -> &'static str {
        "greeting"
    }

    fn can_handle(&self, message: &IncomingMessage) -> bool {
        let text = message.text().to_lowercase();
        text.contains("hello") || text.contains("hi")
    }

    async fn handle(
        &self,
        message: &IncomingMessage,
        transport: &dyn Transport,
    ) -> Result<(), TransportError> {
        transport
            .say(&message.channel, message.reply_ts(), responses::WELCOME)
            .await
    }
}

pub struct DefaultHandler;

#[async_trait]
impl MessageHandler for DefaultHandler {
    fn name(&self) -> &'static str {
        "default"
    }

    fn can_handle(&self, _message: &IncomingMessage) -> bool {
        true
    }

    async fn handle(
        &self,
        message: &IncomingMessage,
        transport: &dyn Transport,
    ) -> Result<(), TransportError> {
        transport
            .say(
                &message.channel,
                message.reply_ts(),
                &responses::default_reply(message.text()),
            )
            .await
    }
}

/// Ordered handler list; the catch-all [`DefaultHandler`] is always last.
pub struct Dispatcher {
    handlers: Vec<Box<dyn MessageHandler>>,
    fallback: DefaultHandler,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("Dispatcher").field("handlers", &names).finish()
    }
}

impl Dispatcher {
    pub fn new(handlers: Vec<Box<dyn MessageHandler>>) -> Self {
        Self {
            handlers,
            fallback: DefaultHandler,
        }
    }

    /// Help, summarize, question, greeting, default.
    pub fn standard(
        answerer: Arc<dyn QuestionAnswerer>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self::new(vec![
            Box::new(HelpHandler),
            Box::new(SummarizeHandler::new(generator)),
            Box::new(QuestionHandler::new(answerer)),
            Box::new(GreetingHandler),
        ])
    }

    pub fn select(&self, message: &IncomingMessage) -> &dyn MessageHandler {
        self.handlers
            .iter()
            .find(|h| h.can_handle(message))
            .map(|h| h.as_ref())
            .unwrap_or(&self.fallback as &dyn MessageHandler)
    }
}
