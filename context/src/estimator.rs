//! Character-ratio token estimation.
//!
//! This is an **approximation**, not a real tokenizer: one token per four
//! characters, rounded up. Precision is intentionally sacrificed for speed —
//! estimating a thousand-message session must stay within single-digit
//! milliseconds, because health is recomputed on every session change.

use ember_types::{ContextMetrics, Role, Session};

/// Approximate characters per token for chat text.
pub const CHARS_PER_TOKEN: u32 = 4;

/// Estimate the token count of a text blob.
///
/// Empty text yields 0; otherwise `ceil(chars / 4)`. Total function, never
/// panics.
#[must_use]
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Estimate aggregate token usage for a session in a single pass.
///
/// Tokens are split by author role. When the session holds a summary record,
/// the summary text itself still occupies context and is counted against the
/// assistant bucket; the replaced originals are not counted.
#[must_use]
pub fn count_session_tokens(session: &Session) -> ContextMetrics {
    let mut metrics = ContextMetrics {
        message_count: session.messages().len(),
        ..ContextMetrics::default()
    };

    for message in session.messages() {
        let tokens = estimate_tokens(message.content());
        match message.role() {
            Role::User => metrics.user_tokens += tokens,
            Role::Assistant => metrics.assistant_tokens += tokens,
        }
    }

    if let Some(record) = session.summary() {
        metrics.assistant_tokens += estimate_tokens(&record.summary);
    }

    metrics.total_tokens = metrics.user_tokens + metrics.assistant_tokens;
    metrics
}
