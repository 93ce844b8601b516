//! Bounded conversation memory.
//!
//! The buffer holds complete (human, assistant) exchanges. Two optional
//! bounds apply after every append: a sliding window of `max_pairs`
//! exchanges, and a token ceiling over the concatenated turn contents. The
//! token bound evicts oldest pairs but always keeps the newest one.

use charter_core::config::HistorySettings;
use charter_core::{AppError, AppResult};
use charter_llm::ChatMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

/// One utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        match self.role {
            Role::Human => ChatMessage::user(self.content.clone()),
            Role::Assistant => ChatMessage::assistant(self.content.clone()),
        }
    }
}

/// Turns as prior chat messages, oldest first.
pub fn to_chat_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns.iter().map(Turn::to_chat_message).collect()
}

/// BPE token counter (`cl100k_base`), cheap to clone.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCounter(cl100k_base)")
    }
}

impl TokenCounter {
    pub fn cl100k() -> AppResult<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| AppError::Config(format!("Failed to load cl100k_base tokenizer: {}", e)))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    turns: Vec<Turn>,
    max_pairs: Option<usize>,
    max_tokens: Option<usize>,
    counter: Option<TokenCounter>,
}

impl HistoryBuffer {
    /// A buffer with neither bound.
    pub fn unbounded() -> Self {
        Self {
            turns: Vec::new(),
            max_pairs: None,
            max_tokens: None,
            counter: None,
        }
    }

    /// A buffer keeping at most `max_pairs` exchanges.
    pub fn with_max_pairs(max_pairs: usize) -> Self {
        Self {
            max_pairs: Some(max_pairs.max(1)),
            ..Self::unbounded()
        }
    }

    /// Add a token ceiling measured with `counter`.
    pub fn with_token_budget(mut self, max_tokens: usize, counter: TokenCounter) -> Self {
        self.max_tokens = Some(max_tokens);
        self.counter = Some(counter);
        self
    }

    /// Build from configuration. `counter` is only used when a token
    /// ceiling is configured.
    pub fn from_settings(settings: &HistorySettings, counter: Option<TokenCounter>) -> AppResult<Self> {
        let mut buffer = match settings.max_pairs {
            Some(pairs) => Self::with_max_pairs(pairs),
            None => Self::unbounded(),
        };

        if let Some(max_tokens) = settings.max_tokens {
            let counter = match counter {
                Some(counter) => counter,
                None => TokenCounter::cl100k()?,
            };
            buffer = buffer.with_token_budget(max_tokens, counter);
        }

        Ok(buffer)
    }

    /// Current turns, oldest first.
    pub fn load(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Record one completed exchange, then enforce the bounds.
    pub fn append(&mut self, human: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(Turn::human(human));
        self.turns.push(Turn::assistant(assistant));
        self.enforce_bounds();
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.turns.len() / 2
    }

    /// Tokens in the concatenated turn contents, if a ceiling is configured.
    pub fn token_count(&self) -> Option<usize> {
        self.counter.as_ref().map(|counter| {
            let joined = self
                .turns
                .iter()
                .map(|t| t.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            counter.count(&joined)
        })
    }

    fn enforce_bounds(&mut self) {
        if let Some(max_pairs) = self.max_pairs {
            while self.pair_count() > max_pairs {
                self.evict_oldest_pair();
            }
        }

        if let Some(max_tokens) = self.max_tokens {
            while self.pair_count() > 1 {
                match self.token_count() {
                    Some(tokens) if tokens > max_tokens => self.evict_oldest_pair(),
                    _ => break,
                }
            }

            if let Some(tokens) = self.token_count().filter(|t| *t > max_tokens) {
                tracing::debug!(
                    tokens,
                    max_tokens,
                    "Latest exchange alone exceeds the history token budget"
                );
            }
        }
    }

    fn evict_oldest_pair(&mut self) {
        self.turns.drain(..2.min(self.turns.len()));
        tracing::trace!(pairs = self.pair_count(), "Evicted oldest exchange");
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::with_max_pairs(3)
    }
}
