//! Approximate token accounting for conversation messages.

use tiktoken_rs::cl100k_base;

use crate::llm::{Message, Role};

/// More tokens get sent than we can count (request framing, schema, role
/// markers), so every counted message carries this flat surcharge. It is
/// meant to be an upper bound on the extra, and it is a guess.
pub const MESSAGE_ENVELOPE_TOKENS: u64 = 300;

pub struct TokenEstimator {
    bpe: tiktoken_rs::CoreBPE,
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self {
            bpe: cl100k_base().expect("failed to initialize tiktoken"),
        }
    }

    /// Approximate token count of one message body.
    pub fn estimate(&self, text: &str) -> u64 {
        self.bpe.encode_with_special_tokens(text).len() as u64
    }

    /// Predicted input cost of re-sending the conversation so far.
    ///
    /// Only user-role messages count: they are the context the engine must
    /// pay to re-send on the next call. Each one carries the envelope
    /// surcharge.
    pub fn input_tokens_in_messages(&self, messages: &[Message]) -> u64 {
        messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| self.estimate(&m.content) + MESSAGE_ENVELOPE_TOKENS)
            .sum()
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_nonzero_for_text() {
        let est = TokenEstimator::new();
        assert!(est.estimate("hello world") > 0);
        assert_eq!(est.estimate(""), 0);
    }

    #[test]
    fn input_tokens_count_only_user_messages() {
        let est = TokenEstimator::new();
        let messages = vec![
            Message::user("first question"),
            Message::assistant("a long reply that should not be counted at all"),
            Message::user("second question"),
        ];
        let expected = est.estimate("first question")
            + MESSAGE_ENVELOPE_TOKENS
            + est.estimate("second question")
            + MESSAGE_ENVELOPE_TOKENS;
        assert_eq!(est.input_tokens_in_messages(&messages), expected);
    }

    #[test]
    fn empty_conversation_costs_nothing() {
        let est = TokenEstimator::new();
        assert_eq!(est.input_tokens_in_messages(&[]), 0);
    }
}
