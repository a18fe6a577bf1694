//! Value types produced by message selection and summarization.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Partition of a session's messages into a summarize prefix and a keep suffix.
///
/// Invariant: `to_summarize.len() + to_keep.len()` equals the input length,
/// `to_summarize` is a strict prefix (oldest first) and `to_keep` the suffix
/// in original order.
#[derive(Debug, Clone, Default)]
pub struct MessageSelection {
    pub to_summarize: Vec<Message>,
    pub to_keep: Vec<Message>,
}

impl MessageSelection {
    /// Keep everything, summarize nothing.
    #[must_use]
    pub fn keep_all(messages: &[Message]) -> Self {
        Self {
            to_summarize: Vec::new(),
            to_keep: messages.to_vec(),
        }
    }

    #[must_use]
    pub fn is_empty_scope(&self) -> bool {
        self.to_summarize.is_empty()
    }
}

/// Final product of one successful summarization run. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizationResult {
    pub summary: String,
    /// Number of token fragments received from the generation capability.
    pub token_count: u32,
    /// Wall-clock time from invocation start to completion.
    pub duration: Duration,
}

impl SummarizationResult {
    #[must_use]
    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }
}
