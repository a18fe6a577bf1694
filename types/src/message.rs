//! Core message domain model.
//!
//! Constructors take `SystemTime` explicitly; callers own the clock.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Capitalized form used when rendering conversation text for prompts.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single conversation message. Immutable once created; owned by a [`Session`].
///
/// [`Session`]: crate::Session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    timestamp: SystemTime,
}

impl Message {
    #[must_use]
    pub fn new(id: MessageId, role: Role, content: impl Into<String>, timestamp: SystemTime) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            timestamp,
        }
    }

    #[must_use]
    pub fn user(id: MessageId, content: impl Into<String>, timestamp: SystemTime) -> Self {
        Self::new(id, Role::User, content, timestamp)
    }

    #[must_use]
    pub fn assistant(id: MessageId, content: impl Into<String>, timestamp: SystemTime) -> Self {
        Self::new(id, Role::Assistant, content, timestamp)
    }

    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}
