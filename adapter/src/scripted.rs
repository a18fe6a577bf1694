//! Deterministic adapter playback for tests and the demo driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{AdapterError, GenerateRequest, GenerationAdapter, TokenFragment, TokenStream};

/// An adapter that replays a fixed fragment script.
///
/// Each `generate` call plays the script from the start. Failures can be
/// injected either at `generate` time or after a given number of fragments.
/// `abort` halts the in-flight stream and is counted, so tests can assert the
/// abort path was exercised.
pub struct ScriptedAdapter {
    fragments: Vec<String>,
    fail_on_generate: Option<String>,
    fail_mid_stream: Option<(usize, String)>,
    fragment_delay: Option<Duration>,
    aborted: Arc<AtomicBool>,
    abort_calls: AtomicUsize,
    last_request: std::sync::Mutex<Option<GenerateRequest>>,
}

impl ScriptedAdapter {
    #[must_use]
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            fail_on_generate: None,
            fail_mid_stream: None,
            fragment_delay: None,
            aborted: Arc::new(AtomicBool::new(false)),
            abort_calls: AtomicUsize::new(0),
            last_request: std::sync::Mutex::new(None),
        }
    }

    /// Fail the `generate` call itself, before any fragment is produced.
    #[must_use]
    pub fn failing_on_generate(message: impl Into<String>) -> Self {
        let mut adapter = Self::new(Vec::<String>::new());
        adapter.fail_on_generate = Some(message.into());
        adapter
    }

    /// Fail the stream after yielding `count` fragments.
    #[must_use]
    pub fn failing_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.fail_mid_stream = Some((count, message.into()));
        self
    }

    /// Insert a delay before each fragment, simulating generation latency.
    #[must_use]
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = Some(delay);
        self
    }

    /// How many times `abort` has been called across all runs.
    #[must_use]
    pub fn abort_count(&self) -> usize {
        self.abort_calls.load(Ordering::SeqCst)
    }

    /// The most recent request passed to `generate`, for assertions.
    #[must_use]
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request.lock().map(|guard| guard.clone()).unwrap_or(None)
    }
}

#[async_trait]
impl GenerationAdapter for ScriptedAdapter {
    async fn generate(&self, request: GenerateRequest) -> Result<Box<dyn TokenStream>, AdapterError> {
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(request);
        }

        if let Some(message) = &self.fail_on_generate {
            return Err(AdapterError::Runtime(message.clone()));
        }

        // A new run supersedes any previous abort.
        self.aborted.store(false, Ordering::SeqCst);

        Ok(Box::new(ScriptedStream {
            fragments: self.fragments.clone(),
            position: 0,
            fail_mid_stream: self.fail_mid_stream.clone(),
            fragment_delay: self.fragment_delay,
            aborted: Arc::clone(&self.aborted),
        }))
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.abort_calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("scripted adapter abort requested");
    }
}

struct ScriptedStream {
    fragments: Vec<String>,
    position: usize,
    fail_mid_stream: Option<(usize, String)>,
    fragment_delay: Option<Duration>,
    aborted: Arc<AtomicBool>,
}

#[async_trait]
impl TokenStream for ScriptedStream {
    async fn next_fragment(&mut self) -> Result<Option<TokenFragment>, AdapterError> {
        if self.aborted.load(Ordering::SeqCst) {
            return Ok(None);
        }

        if let Some((fail_after, message)) = &self.fail_mid_stream
            && self.position >= *fail_after
        {
            return Err(AdapterError::Runtime(message.clone()));
        }

        if self.position >= self.fragments.len() {
            return Ok(None);
        }

        if let Some(delay) = self.fragment_delay {
            tokio::time::sleep(delay).await;
        }

        let fragment = TokenFragment::new(self.fragments[self.position].clone());
        self.position += 1;
        Ok(Some(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(stream: &mut Box<dyn TokenStream>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(fragment) = stream.next_fragment().await.expect("no failure scripted") {
            out.push(fragment.text);
        }
        out
    }

    #[tokio::test]
    async fn replays_fragments_in_order() {
        let adapter = ScriptedAdapter::new(["Sum", "mary"]);
        let mut stream = adapter
            .generate(GenerateRequest::new("prompt"))
            .await
            .expect("generate");
        assert_eq!(collect(&mut stream).await, vec!["Sum", "mary"]);
        // Exhausted streams keep reporting completion.
        assert!(stream.next_fragment().await.expect("done").is_none());
    }

    #[tokio::test]
    async fn generate_failure_yields_no_stream() {
        let adapter = ScriptedAdapter::failing_on_generate("model not loaded");
        let err = adapter
            .generate(GenerateRequest::new("prompt"))
            .await
            .err()
            .expect("scripted failure");
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn mid_stream_failure_after_fragments() {
        let adapter = ScriptedAdapter::new(["a", "b", "c"]).failing_after(2, "runtime crashed");
        let mut stream = adapter
            .generate(GenerateRequest::new("prompt"))
            .await
            .expect("generate");
        assert!(stream.next_fragment().await.is_ok());
        assert!(stream.next_fragment().await.is_ok());
        assert!(stream.next_fragment().await.is_err());
    }

    #[tokio::test]
    async fn abort_halts_stream_and_is_counted() {
        let adapter = ScriptedAdapter::new(["a", "b", "c"]);
        let mut stream = adapter
            .generate(GenerateRequest::new("prompt"))
            .await
            .expect("generate");
        let first = stream.next_fragment().await.expect("fragment");
        assert_eq!(first.expect("present").text, "a");

        adapter.abort();
        adapter.abort(); // idempotent
        assert_eq!(adapter.abort_count(), 2);
        assert!(stream.next_fragment().await.expect("halted").is_none());
    }

    #[tokio::test]
    async fn new_run_clears_prior_abort() {
        let adapter = ScriptedAdapter::new(["a"]);
        adapter.abort();
        let mut stream = adapter
            .generate(GenerateRequest::new("prompt"))
            .await
            .expect("generate");
        assert!(stream.next_fragment().await.expect("fresh run").is_some());
    }

    #[tokio::test]
    async fn records_last_request() {
        let adapter = ScriptedAdapter::new(["a"]);
        let mut request = GenerateRequest::new("the prompt");
        request.max_tokens = Some(256);
        request.temperature = Some(0.7);
        let _ = adapter.generate(request).await.expect("generate");

        let seen = adapter.last_request().expect("request recorded");
        assert_eq!(seen.prompt, "the prompt");
        assert_eq!(seen.max_tokens, Some(256));
    }
}
