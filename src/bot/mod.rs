//! Chat assistant: message filtering, intent dispatch and replies.

mod error;
pub mod handlers;
mod message;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod responses;
mod transport;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

pub use error::TransportError;
pub use handlers::{
    DefaultHandler, Dispatcher, GreetingHandler, HelpHandler, MessageHandler, QuestionHandler,
    SummarizeHandler, format_answer,
};
pub use message::{BOT_MESSAGE_SUBTYPE, IncomingMessage};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockTransport, SentMessage};
pub use transport::Transport;

/// What [`Bot::handle_message`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Posted by a bot, or missing author or text.
    Ignored,
    /// Replied through the named handler.
    Handled(&'static str),
    /// The named handler failed; the generic error reply was attempted.
    Failed(&'static str),
}

/// Entry point for platform events.
#[derive(Clone)]
pub struct Bot {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl Bot {
    pub fn new(transport: Arc<dyn Transport>, dispatcher: Dispatcher) -> Self {
        Self {
            transport,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    #[instrument(skip(self, message), fields(channel = %message.channel, ts = %message.ts))]
    pub async fn handle_message(&self, message: &IncomingMessage) -> HandleOutcome {
        if message.is_from_bot() {
            debug!("Ignoring bot message");
            return HandleOutcome::Ignored;
        }
        if !message.is_actionable() {
            warn!("Received a message without a user or text");
            return HandleOutcome::Ignored;
        }

        let reply_ts = message.reply_ts();
        if let Err(e) = self
            .transport
            .say(&message.channel, reply_ts, responses::WORKING)
            .await
        {
            warn!(error = %e, "Failed to post working notice");
        }

        let handler = self.dispatcher.select(message);
        info!(handler = handler.name(), "Dispatching message");

        match handler.handle(message, self.transport.as_ref()).await {
            Ok(()) => HandleOutcome::Handled(handler.name()),
            Err(e) => {
                error!(handler = handler.name(), error = %e, "Handler failed");
                if let Err(e) = self
                    .transport
                    .say(&message.channel, reply_ts, responses::ERROR)
                    .await
                {
                    warn!(error = %e, "Failed to post error reply");
                }
                HandleOutcome::Failed(handler.name())
            }
        }
    }

    #[instrument(skip(self, message), fields(channel = %message.channel, ts = %message.ts))]
    pub async fn handle_mention(&self, message: &IncomingMessage) -> Result<(), TransportError> {
        self.transport
            .say(&message.channel, message.reply_ts(), responses::MENTION)
            .await
    }
}
