//! Sessions and their summary records.
//!
//! A [`Session`] owns its messages as an insertion-ordered list. When an older
//! prefix of the conversation is summarized, that prefix moves into a
//! [`SummaryRecord`] so the originals stay retrievable for later expansion.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{MessageId, SessionId};
use crate::message::Message;

/// A condensed stand-in for a contiguous prefix of original messages.
///
/// Ownership of the replaced messages transfers to this record; they are not
/// part of the session's live message list while the summary is in effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub summary: String,
    /// The original messages the summary replaces, oldest first.
    pub original_messages: Vec<Message>,
    pub summarized_at: SystemTime,
    pub message_count: usize,
    /// Estimated token count of the originals before summarization.
    pub original_tokens: u32,
    /// Token count of the generated summary.
    pub summary_tokens: u32,
}

impl SummaryRecord {
    /// Ids of the replaced messages, in their original order.
    #[must_use]
    pub fn original_ids(&self) -> Vec<MessageId> {
        self.original_messages.iter().map(Message::id).collect()
    }
}

/// Payload for applying a completed summarization to a session.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub summary: String,
    /// Ids of the messages the summary replaces (a strict prefix, oldest first).
    pub summarized_ids: Vec<MessageId>,
    pub original_tokens: u32,
    pub summary_tokens: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummaryApplyError {
    #[error("session already holds a summary record")]
    AlreadySummarized,
    #[error("summary replaces no messages")]
    EmptyScope,
    #[error("summarized ids do not match the head of the message list")]
    PrefixMismatch,
    #[error("session holds no summary record to expand")]
    NothingToExpand,
}

/// A conversation session. Messages are append/replace only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    title: String,
    messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<SummaryRecord>,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId, title: impl Into<String>, now: SystemTime) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The live message list. Excludes messages folded into the summary record.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn summary(&self) -> Option<&SummaryRecord> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> SystemTime {
        self.updated_at
    }

    pub fn push_message(&mut self, message: Message, now: SystemTime) {
        self.messages.push(message);
        self.updated_at = now;
    }

    /// Replace the summarized prefix with a summary record.
    ///
    /// The outcome's ids must exactly match the current head of the message
    /// list; a mismatch means the session mutated under an in-flight run and
    /// the result is rejected rather than applied to the wrong messages.
    pub fn apply_summary(
        &mut self,
        outcome: SummaryOutcome,
        now: SystemTime,
    ) -> Result<(), SummaryApplyError> {
        if self.summary.is_some() {
            return Err(SummaryApplyError::AlreadySummarized);
        }
        if outcome.summarized_ids.is_empty() {
            return Err(SummaryApplyError::EmptyScope);
        }
        if outcome.summarized_ids.len() > self.messages.len() {
            return Err(SummaryApplyError::PrefixMismatch);
        }
        let prefix_matches = self
            .messages
            .iter()
            .zip(&outcome.summarized_ids)
            .all(|(message, id)| message.id() == *id);
        if !prefix_matches {
            return Err(SummaryApplyError::PrefixMismatch);
        }

        let original_messages: Vec<Message> = self
            .messages
            .drain(..outcome.summarized_ids.len())
            .collect();
        let message_count = original_messages.len();

        self.summary = Some(SummaryRecord {
            summary: outcome.summary,
            original_messages,
            summarized_at: now,
            message_count,
            original_tokens: outcome.original_tokens,
            summary_tokens: outcome.summary_tokens,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Restore the summarized originals to the front of the message list.
    pub fn expand_summary(&mut self, now: SystemTime) -> Result<SummaryRecord, SummaryApplyError> {
        let record = self
            .summary
            .take()
            .ok_or(SummaryApplyError::NothingToExpand)?;
        let mut restored = record.original_messages.clone();
        restored.append(&mut self.messages);
        self.messages = restored;
        self.updated_at = now;
        Ok(record)
    }
}
