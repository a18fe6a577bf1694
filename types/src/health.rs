//! Derived context-usage types.
//!
//! Both types here are recomputed on demand from a session and a model's
//! context window; neither is persisted independently.

use serde::{Deserialize, Serialize};

/// Aggregate token usage for a session, split by role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMetrics {
    pub total_tokens: u32,
    pub message_count: usize,
    pub user_tokens: u32,
    pub assistant_tokens: u32,
}

/// Health tier for aggregate context usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    Healthy,
    Growing,
    Critical,
}

impl ContextStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContextStatus::Healthy => "healthy",
            ContextStatus::Growing => "growing",
            ContextStatus::Critical => "critical",
        }
    }
}

/// Classification of context usage against a model's context window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextHealth {
    pub status: ContextStatus,
    /// Usage as a percentage of the context window, clamped to `[0, 100]`.
    pub percentage: f64,
    pub tokens_used: u32,
    /// Remaining capacity, floored at zero.
    pub tokens_remaining: u32,
    pub message_count: usize,
    pub max_context_length: u32,
}
