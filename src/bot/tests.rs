use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::*;
use crate::cache::{Answer, AnswerError, CacheStatus, QuestionAnswerer};
use crate::embedding::ProviderError;
use crate::generation::MockGenerator;

struct CannedAnswerer {
    answer: Option<Answer>,
    calls: AtomicUsize,
}

impl CannedAnswerer {
    fn hit(text: &str, source: CacheStatus) -> Self {
        Self {
            answer: Some(Answer {
                text: text.to_string(),
                source,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QuestionAnswerer for CannedAnswerer {
    async fn answer(&self, _question: &str) -> Result<Answer, AnswerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| AnswerError::Embedding(ProviderError::with_status("boom", 500)))
    }
}

fn bot_with(answerer: Arc<CannedAnswerer>) -> (Bot, Arc<MockTransport>, Arc<MockGenerator>) {
    let transport = Arc::new(MockTransport::new());
    let generator = Arc::new(MockGenerator::new());
    let bot = Bot::new(
        transport.clone(),
        Dispatcher::standard(answerer, generator.clone()),
    );
    (bot, transport, generator)
}

fn bot() -> (Bot, Arc<MockTransport>, Arc<MockGenerator>) {
    bot_with(Arc::new(CannedAnswerer::hit("cached", CacheStatus::Miss)))
}

fn message(text: &str) -> IncomingMessage {
    IncomingMessage {
        channel: "C123".to_string(),
        ts: "1700000000.000100".to_string(),
        thread_ts: None,
        text: Some(text.to_string()),
        user: Some("U123".to_string()),
        subtype: None,
    }
}

fn threaded(text: &str) -> IncomingMessage {
    IncomingMessage {
        thread_ts: Some("1699999999.000001".to_string()),
        ..message(text)
    }
}

#[tokio::test]
async fn test_help_wins_over_question() {
    let (bot, transport, _) = bot();

    let outcome = bot.handle_message(&message("!help what can you do?")).await;

    assert_eq!(outcome, HandleOutcome::Handled("help"));
    assert_eq!(transport.texts(), vec![responses::WORKING, responses::HELP]);
}

#[tokio::test]
async fn test_question_reply_marks_fast_hit() {
    let answerer = Arc::new(CannedAnswerer::hit(
        "Redis stores data in-memory.",
        CacheStatus::HitFast,
    ));
    let (bot, transport, _) = bot_with(answerer.clone());

    let outcome = bot.handle_message(&message("What is Redis?")).await;

    assert_eq!(outcome, HandleOutcome::Handled("question"));
    assert_eq!(answerer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        transport.texts()[1],
        "I found a similar question in cache! Here's the answer:\nRedis stores data in-memory."
    );
}

#[tokio::test]
async fn test_question_failure_replies_with_question_error() {
    let (bot, transport, _) = bot_with(Arc::new(CannedAnswerer::failing()));

    let outcome = bot.handle_message(&message("Why?")).await;

    assert_eq!(outcome, HandleOutcome::Handled("question"));
    assert_eq!(transport.texts()[1], responses::QUESTION_ERROR);
}

#[test]
fn test_format_answer_prefixes() {
    assert_eq!(
        format_answer("x", CacheStatus::HitDurable),
        "I found a similar question! Here's the answer:\nx"
    );
    assert_eq!(format_answer("x", CacheStatus::Miss), "x");
}

#[tokio::test]
async fn test_summarize_outside_thread() {
    let (bot, transport, generator) = bot();

    bot.handle_message(&message("!summarize please")).await;

    let sent = transport.sent();
    assert_eq!(sent[1].text, responses::SUMMARIZE_NO_THREAD);
    assert_eq!(sent[1].thread_ts, "1700000000.000100");
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_summarize_joins_thread_messages() {
    let (bot, transport, generator) = bot();
    transport.set_thread("1699999999.000001", vec!["first", "second", "!summarize"]);

    let outcome = bot.handle_message(&threaded("!SUMMARIZE")).await;

    assert_eq!(outcome, HandleOutcome::Handled("summarize"));
    assert_eq!(generator.transcripts(), vec!["first\nsecond\n!summarize"]);
    let sent = transport.sent();
    assert_eq!(sent[1].text, "summary of 3 lines");
    assert_eq!(sent[1].thread_ts, "1699999999.000001");
}

#[tokio::test]
async fn test_summarize_failure_replies_with_summarize_error() {
    let (bot, transport, generator) = bot();
    transport.set_fail_threads(true);

    bot.handle_message(&threaded("!summarize")).await;
    assert_eq!(transport.texts()[1], responses::SUMMARIZE_ERROR);

    transport.set_fail_threads(false);
    generator.set_fail(true);
    bot.handle_message(&threaded("!summarize")).await;
    assert_eq!(transport.texts()[3], responses::SUMMARIZE_ERROR);
}

#[tokio::test]
async fn test_greeting_and_default() {
    let (bot, transport, _) = bot();

    assert_eq!(
        bot.handle_message(&message("Hello there")).await,
        HandleOutcome::Handled("greeting")
    );
    assert_eq!(
        bot.handle_message(&message("deploy done")).await,
        HandleOutcome::Handled("default")
    );

    let texts = transport.texts();
    assert_eq!(texts[1], responses::WELCOME);
    assert_eq!(
        texts[3],
        "I received your message: \"deploy done\" Need help? Try `!help` for a list of commands"
    );
}

#[tokio::test]
async fn test_ignores_bot_and_empty_messages() {
    let (bot, transport, _) = bot();

    let from_bot = IncomingMessage {
        subtype: Some(BOT_MESSAGE_SUBTYPE.to_string()),
        ..message("What is Redis?")
    };
    let no_user = IncomingMessage {
        user: None,
        ..message("What is Redis?")
    };
    let no_text = IncomingMessage {
        text: None,
        ..message("")
    };

    assert_eq!(bot.handle_message(&from_bot).await, HandleOutcome::Ignored);
    assert_eq!(bot.handle_message(&no_user).await, HandleOutcome::Ignored);
    assert_eq!(bot.handle_message(&no_text).await, HandleOutcome::Ignored);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_handler_delivery_failure_posts_error() {
    let (bot, transport, _) = bot();
    // Working notice succeeds, the handler's reply fails, the error reply fails too.
    transport.fail_say_from(1);

    let outcome = bot.handle_message(&message("ok")).await;

    assert_eq!(outcome, HandleOutcome::Failed("default"));
    assert_eq!(transport.texts(), vec![responses::WORKING]);
}

#[tokio::test]
async fn test_replies_go_to_existing_thread() {
    let (bot, transport, _) = bot();

    bot.handle_message(&threaded("!help")).await;

    assert!(
        transport
            .sent()
            .iter()
            .all(|m| m.thread_ts == "1699999999.000001")
    );
}

#[tokio::test]
async fn test_mention_reply() {
    let (bot, transport, _) = bot();

    bot.handle_mention(&message("<@U999> hey")).await.unwrap();

    assert_eq!(transport.texts(), vec![responses::MENTION]);
}

#[test]
fn test_incoming_message_deserializes_slack_event() {
    let json = serde_json::json!({
        "type": "message",
        "channel": "C1",
        "user": "U1",
        "text": "What is Redis?",
        "ts": "1.2",
        "event_ts": "1.2",
        "channel_type": "channel"
    });
    let message: IncomingMessage = serde_json::from_value(json).unwrap();

    assert_eq!(message.reply_ts(), "1.2");
    assert!(message.is_actionable());
    assert!(!message.is_from_bot());
}
