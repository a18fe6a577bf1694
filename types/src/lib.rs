//! Core domain types for Ember.
//!
//! This crate holds the data model shared by the context and engine crates:
//! sessions, messages, derived context-health values, and summarization
//! results. No IO, no async — construction-time validation only.

mod health;
mod ids;
mod message;
mod session;
mod summarize;

pub use health::{ContextHealth, ContextMetrics, ContextStatus};
pub use ids::{MessageId, SessionId};
pub use message::{Message, Role};
pub use session::{Session, SummaryApplyError, SummaryOutcome, SummaryRecord};
pub use summarize::{MessageSelection, SummarizationResult};
