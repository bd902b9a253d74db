//! User-facing reply texts.

pub const WORKING: &str = "Working on it...";

pub const WELCOME: &str = "👋 Hello! I'm your AI assistant. I can help you with:
• Summarizing threads (use `!summarize` in a thread)
• Answering questions (just end with a ? mark)
• Finding similar messages";

pub const HELP: &str = "Available commands:
• Ask a question (end with a ? mark)
• `!summarize` - Summarize the current thread
• `!help` - Show this help message
• Say hello";

pub const ERROR: &str = "Sorry, I encountered an error processing your request.";

pub const QUESTION_ERROR: &str =
    "I'm having trouble answering your question right now. Please try again later.";

pub const SUMMARIZE_ERROR: &str = "Error generating summary";

pub const SUMMARIZE_NO_THREAD: &str = "This command must be used in a thread";

pub const MENTION: &str = "Hello! I'm here to help. Use `!summarize` in a thread to get a summary.";

pub const FAST_HIT_PREFIX: &str = "I found a similar question in cache! Here's the answer:\n";

pub const DURABLE_HIT_PREFIX: &str = "I found a similar question! Here's the answer:\n";

pub const HELP_COMMAND: &str = "!help";

pub const SUMMARIZE_COMMAND: &str = "!summarize";

/// Echo reply for messages no other handler claims.
pub fn default_reply(text: &str) -> String {
    format!(
        "I received your message: \"{}\" Need help? Try `!help` for a list of commands",
        text
    )
}
