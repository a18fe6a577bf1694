//! Context health classification.
//!
//! Stateless: recomputed whenever session messages or the selected model's
//! context window change.

use ember_types::{ContextHealth, ContextMetrics, ContextStatus};

/// Usage percentage at which a context counts as growing (inclusive).
pub const GROWING_THRESHOLD: f64 = 50.0;
/// Usage percentage at which a context counts as critical (inclusive).
pub const CRITICAL_THRESHOLD: f64 = 80.0;

/// Classify aggregate context usage against a model's context window.
///
/// A zero context window never panics; it is treated as 0% usage, healthy.
#[must_use]
pub fn calculate_context_health(metrics: &ContextMetrics, max_context_length: u32) -> ContextHealth {
    let percentage = if max_context_length > 0 {
        (f64::from(metrics.total_tokens) / f64::from(max_context_length) * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let status = if percentage >= CRITICAL_THRESHOLD {
        ContextStatus::Critical
    } else if percentage >= GROWING_THRESHOLD {
        ContextStatus::Growing
    } else {
        ContextStatus::Healthy
    };

    ContextHealth {
        status,
        percentage,
        tokens_used: metrics.total_tokens,
        tokens_remaining: max_context_length.saturating_sub(metrics.total_tokens),
        message_count: metrics.message_count,
        max_context_length,
    }
}
