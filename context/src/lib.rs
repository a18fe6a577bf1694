//! Context health classification and summarization selection.
//!
//! This crate provides the pure, total functions underneath the summarization
//! engine:
//!
//! - Character-ratio token estimation ([`estimate_tokens`],
//!   [`count_session_tokens`])
//! - Health-tier classification against a model's context window
//!   ([`calculate_context_health`])
//! - Oldest-first message selection ([`select_for_summarization`])
//! - A context-window catalog for local model families ([`ModelCatalog`])
//!
//! Nothing here suspends, allocates beyond its outputs, or fails: all inputs
//! (empty text, zero context windows, degenerate fractions) are handled by
//! clamping or defaulting.

mod catalog;
mod estimator;
mod health;
mod selector;

pub use catalog::{
    CatalogSource, DEFAULT_CONTEXT_WINDOW, ModelCatalog, ResolvedContextWindow,
};
pub use estimator::{CHARS_PER_TOKEN, count_session_tokens, estimate_tokens};
pub use health::{CRITICAL_THRESHOLD, GROWING_THRESHOLD, calculate_context_health};
pub use selector::select_for_summarization;
