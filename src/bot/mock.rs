use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::TransportError;
use super::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: String,
    pub thread_ts: String,
    pub text: String,
}

/// Records replies and serves canned thread histories.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<SentMessage>>,
    threads: Mutex<HashMap<String, Vec<String>>>,
    /// Fail `say` calls whose index (0-based) is at or after this value.
    fail_say_from: Mutex<Option<usize>>,
    say_calls: AtomicUsize,
    fail_threads: AtomicBool,
    unhealthy: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_thread(&self, thread_ts: &str, messages: Vec<&str>) {
        self.threads.lock().expect("lock poisoned").insert(
            thread_ts.to_string(),
            messages.into_iter().map(str::to_string).collect(),
        );
    }

    /// Makes the `n`-th and later `say` calls fail.
    pub fn fail_say_from(&self, n: usize) {
        *self.fail_say_from.lock().expect("lock poisoned") = Some(n);
    }

    pub fn set_fail_threads(&self, fail: bool) {
        self.fail_threads.store(fail, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("lock poisoned").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn say(&self, channel: &str, thread_ts: &str, text: &str) -> Result<(), TransportError> {
        let index = self.say_calls.fetch_add(1, Ordering::SeqCst);
        let fail_from = *self.fail_say_from.lock().expect("lock poisoned");
        if fail_from.is_some_and(|n| index >= n) {
            return Err(TransportError::Api {
                method: "chat.postMessage",
                error: "channel_not_found".to_string(),
            });
        }

        self.sent.lock().expect("lock poisoned").push(SentMessage {
            channel: channel.to_string(),
            thread_ts: thread_ts.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn thread_messages(
        &self,
        _channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<String>, TransportError> {
        if self.fail_threads.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                method: "conversations.replies",
                error: "thread_not_found".to_string(),
            });
        }
        Ok(self
            .threads
            .lock()
            .expect("lock poisoned")
            .get(thread_ts)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_healthy(&self) -> bool {
        !self.unhealthy.load(Ordering::SeqCst)
    }
}
