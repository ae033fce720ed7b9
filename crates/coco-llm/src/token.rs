//! Token counting
//!
//! Uses tiktoken's cl100k_base encoding. Claude models tokenize differently,
//! so counts are estimates, but they are stable and deterministic, which is
//! what history budgeting needs.

use crate::message::Message;
use std::sync::LazyLock;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Global tokenizer instance (initialized once, thread-safe)
static TOKENIZER: LazyLock<CoreBPE> = LazyLock::new(|| {
    cl100k_base().expect("cl100k_base tokenizer is a compile-time constant and should never fail")
});

/// Role marker and separators added per message
const MESSAGE_OVERHEAD: usize = 6;

/// Token counter for estimating text and message sizes
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    /// Create a new token counter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Count tokens in a string
    #[must_use]
    pub fn count_tokens(&self, text: &str) -> usize {
        TOKENIZER.encode_with_special_tokens(text).len()
    }

    /// Count tokens in a message (includes role overhead)
    #[must_use]
    pub fn count_message_tokens(&self, message: &Message) -> usize {
        self.count_tokens(&message.content) + MESSAGE_OVERHEAD
    }

    /// Count total tokens in a conversation
    #[must_use]
    pub fn count_conversation_tokens(&self, messages: &[Message]) -> usize {
        const CONVERSATION_OVERHEAD: usize = 3;
        messages
            .iter()
            .map(|m| self.count_message_tokens(m))
            .sum::<usize>()
            + CONVERSATION_OVERHEAD
    }

    /// Cut `text` down to at most `max_tokens` tokens
    ///
    /// Returns the input unchanged when it already fits.
    #[must_use]
    pub fn truncate_to_tokens(&self, text: &str, max_tokens: usize) -> String {
        let tokens = TOKENIZER.encode_with_special_tokens(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }

        // A cut can split a multi-byte character; back off a few tokens
        // until the prefix decodes cleanly.
        let mut end = max_tokens;
        while end > 0 && max_tokens - end < 4 {
            if let Ok(prefix) = TOKENIZER.decode(tokens[..end].to_vec()) {
                return prefix;
            }
            end -= 1;
        }

        let ratio = max_tokens as f64 / tokens.len() as f64;
        let keep = (text.chars().count() as f64 * ratio) as usize;
        text.chars().take(keep).collect()
    }
}

/// Convenience function to count tokens in text
#[must_use]
pub fn count_tokens(text: &str) -> usize {
    TokenCounter::new().count_tokens(text)
}
