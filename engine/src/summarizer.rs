//! Conversation summarization via the generation adapter.
//!
//! Formats a selected message prefix into a summarization prompt, hands it to
//! the injected [`GenerationAdapter`], and exposes the run as a pull-based
//! stream of partial-text chunks with a final [`SummarizationResult`]. All
//! generation happens through the adapter; this module performs no IO of its
//! own.

use std::time::Instant;

use thiserror::Error;

use ember_adapter::{AdapterError, GenerateRequest, GenerationAdapter, TokenStream};
use ember_types::{Message, SummarizationResult};

use crate::config::{DEFAULT_SUMMARY_MAX_TOKENS, DEFAULT_SUMMARY_TEMPERATURE};

/// Generation parameters for one summarization run.
#[derive(Debug, Clone, Copy)]
pub struct SummarizeOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_SUMMARY_MAX_TOKENS,
            temperature: DEFAULT_SUMMARY_TEMPERATURE,
        }
    }
}

/// A generation failure during summarization.
///
/// Cancellation is never represented as this error; it is a clean return to
/// idle handled by the coordinator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("summarization of {message_count} messages failed: {reason}")]
pub struct SummarizationError {
    /// How many messages the failed run covered.
    pub message_count: usize,
    /// The underlying adapter failure, as reported.
    pub reason: String,
}

impl SummarizationError {
    fn from_adapter(message_count: usize, err: &AdapterError) -> Self {
        Self {
            message_count,
            reason: err.to_string(),
        }
    }
}

/// Build the summarization prompt for a slice of messages.
///
/// Each message renders as `"<Role>: <content>"` with the role capitalized,
/// joined by blank lines, wrapped in a fixed instruction block describing what
/// the summary must preserve.
#[must_use]
pub fn build_summary_prompt(messages: &[Message]) -> String {
    let conversation = messages
        .iter()
        .map(|message| format!("{}: {}", message.role().label(), message.content()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Summarize the following conversation. Preserve the key topics discussed, \
decisions reached, and any facts or details needed to continue the conversation \
naturally. Note unresolved questions. Be concise and start directly with the \
summary content.\n\nConversation:\n\n{conversation}\n\nSummary:"
    )
}

/// Start a summarization run against the adapter.
///
/// Resolves the adapter's token stream once and returns a [`SummaryStream`] to
/// pull chunks from. Wall-clock duration is measured from this call. Errors
/// are wrapped once as [`SummarizationError`]; there is no internal retry.
pub async fn summarize_messages(
    adapter: &dyn GenerationAdapter,
    messages: &[Message],
    options: SummarizeOptions,
) -> Result<SummaryStream, SummarizationError> {
    let started = Instant::now();
    let message_count = messages.len();

    let request = GenerateRequest {
        prompt: build_summary_prompt(messages),
        max_tokens: Some(options.max_tokens),
        temperature: Some(options.temperature),
        stop_sequences: None,
    };

    tracing::debug!(message_count, "starting summary generation");
    let stream = adapter
        .generate(request)
        .await
        .map_err(|e| SummarizationError::from_adapter(message_count, &e))?;

    Ok(SummaryStream {
        inner: stream,
        started,
        message_count,
        summary: String::new(),
        token_count: 0,
        result: None,
        finished: false,
    })
}

/// A single summarization run: finite, non-restartable, consumed once.
///
/// Pull chunks with [`next_chunk`](Self::next_chunk) until it returns
/// `Ok(None)`, then take the terminal value with [`finish`](Self::finish).
pub struct SummaryStream {
    inner: Box<dyn TokenStream>,
    started: Instant,
    message_count: usize,
    summary: String,
    token_count: u32,
    result: Option<SummarizationResult>,
    finished: bool,
}

impl SummaryStream {
    /// Pull the next partial-text chunk.
    ///
    /// Chunks are accumulated internally in arrival order; on clean exhaustion
    /// the terminal [`SummarizationResult`] becomes available via `finish`.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, SummarizationError> {
        if self.finished {
            return Ok(None);
        }

        match self.inner.next_fragment().await {
            Ok(Some(fragment)) => {
                self.summary.push_str(&fragment.text);
                self.token_count += 1;
                Ok(Some(fragment.text))
            }
            Ok(None) => {
                self.finished = true;
                self.result = Some(SummarizationResult {
                    summary: std::mem::take(&mut self.summary),
                    token_count: self.token_count,
                    duration: self.started.elapsed(),
                });
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(SummarizationError::from_adapter(self.message_count, &e))
            }
        }
    }

    /// The accumulated summary text so far.
    #[must_use]
    pub fn summary_so_far(&self) -> &str {
        if let Some(result) = &self.result {
            &result.summary
        } else {
            &self.summary
        }
    }

    /// Terminal value, present only after clean exhaustion.
    #[must_use]
    pub fn finish(self) -> Option<SummarizationResult> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use ember_adapter::ScriptedAdapter;
    use ember_types::{MessageId, Role};

    use super::*;

    fn messages(contents: &[(Role, &str)]) -> Vec<Message> {
        contents
            .iter()
            .enumerate()
            .map(|(i, (role, content))| {
                Message::new(MessageId::new(i as u64), *role, *content, SystemTime::UNIX_EPOCH)
            })
            .collect()
    }

    #[test]
    fn prompt_formats_roles_capitalized_and_blank_line_joined() {
        let prompt = build_summary_prompt(&messages(&[
            (Role::User, "Hello there"),
            (Role::Assistant, "Hi! How can I help?"),
        ]));

        assert!(prompt.contains("User: Hello there\n\nAssistant: Hi! How can I help?"));
        assert!(prompt.contains("Summarize the following conversation"));
        assert!(prompt.contains("decisions reached"));
        assert!(prompt.contains("continue the conversation"));
    }

    #[test]
    fn prompt_preserves_message_order() {
        let prompt = build_summary_prompt(&messages(&[
            (Role::User, "first topic"),
            (Role::Assistant, "second topic"),
            (Role::User, "third topic"),
        ]));

        let first = prompt.find("first topic").expect("present");
        let second = prompt.find("second topic").expect("present");
        let third = prompt.find("third topic").expect("present");
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn accumulates_chunks_into_final_result() {
        let adapter = ScriptedAdapter::new(["Sum", "mary"]);
        let mut stream = summarize_messages(
            &adapter,
            &messages(&[(Role::User, "hi"), (Role::Assistant, "hello")]),
            SummarizeOptions::default(),
        )
        .await
        .expect("stream");

        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next_chunk().await.expect("no failure") {
            chunks.push(chunk);
        }
        assert_eq!(chunks, vec!["Sum", "mary"]);

        let result = stream.finish().expect("terminal value");
        assert_eq!(result.summary, "Summary");
        assert_eq!(result.token_count, 2);
    }

    #[tokio::test]
    async fn default_parameters_reach_the_adapter() {
        let adapter = ScriptedAdapter::new(["x"]);
        let _ = summarize_messages(
            &adapter,
            &messages(&[(Role::User, "hi")]),
            SummarizeOptions::default(),
        )
        .await
        .expect("stream");

        let request = adapter.last_request().expect("request recorded");
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.prompt.contains("User: hi"));
    }

    #[tokio::test]
    async fn generate_failure_is_wrapped_with_message_count() {
        let adapter = ScriptedAdapter::failing_on_generate("model not loaded");
        let err = summarize_messages(
            &adapter,
            &messages(&[(Role::User, "a"), (Role::User, "b"), (Role::User, "c")]),
            SummarizeOptions::default(),
        )
        .await
        .err()
        .expect("failure");

        assert_eq!(err.message_count, 3);
        assert!(err.reason.contains("model not loaded"));
    }

    #[tokio::test]
    async fn mid_stream_failure_is_wrapped_and_terminal() {
        let adapter = ScriptedAdapter::new(["a", "b"]).failing_after(1, "runtime crashed");
        let mut stream = summarize_messages(
            &adapter,
            &messages(&[(Role::User, "hi")]),
            SummarizeOptions::default(),
        )
        .await
        .expect("stream");

        assert_eq!(stream.next_chunk().await.expect("first"), Some("a".to_string()));
        let err = stream.next_chunk().await.unwrap_err();
        assert!(err.reason.contains("runtime crashed"));
        // No terminal value after a failure.
        assert!(stream.finish().is_none());
    }

    #[tokio::test]
    async fn no_result_before_exhaustion() {
        let adapter = ScriptedAdapter::new(["a"]);
        let stream = summarize_messages(
            &adapter,
            &messages(&[(Role::User, "hi")]),
            SummarizeOptions::default(),
        )
        .await
        .expect("stream");
        assert!(stream.finish().is_none());
    }
}
