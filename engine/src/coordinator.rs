//! Summarization coordinator: the state machine exposed to UI layers.
//!
//! One coordinator instance runs at most one summarization at a time:
//!
//! ```text
//! idle --start--> pending --(adapter ready)--> summarizing --+--> success
//!   ^                 |                             |        +--> error
//!   |                 +--------- cancel ------------+
//!   +-----------------------------------------------+
//! ```
//!
//! The generation task communicates over an event channel; the coordinator
//! applies one event per [`next_transition`](SummarizeCoordinator::next_transition)
//! call, so every state change is an explicit, observable step a UI loop or
//! test harness can await deterministically.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use tokio::sync::mpsc;

use ember_adapter::GenerationAdapter;
use ember_context::{ModelCatalog, calculate_context_health, count_session_tokens, estimate_tokens, select_for_summarization};
use ember_types::{ContextHealth, ContextMetrics, MessageId, SessionId, SummarizationResult, SummaryOutcome};

use crate::config::EngineConfig;
use crate::store::SharedSessionStore;
use crate::summarizer::{SummarizationError, SummarizeOptions, summarize_messages};

/// Visible progress is capped here until the run completes, since the total
/// token count is unknown ahead of time.
pub const PROGRESS_DISPLAY_CAP: u8 = 90;

const RUN_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizePhase {
    Idle,
    Pending,
    Summarizing,
    Success,
    Error,
}

/// Outcome of a `start_summarization` call.
///
/// Guard failures are silent no-ops by design, but the variant tells callers
/// why nothing started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizeStart {
    Started,
    /// A run is already in flight; re-entry never starts a second one.
    NotIdle,
    NoActiveSession,
    /// The active session has fewer messages than the minimum-keep floor.
    TooFewMessages,
    /// Selection produced nothing to summarize.
    NothingToSummarize,
}

/// One observed state-machine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarizeTransition {
    /// The adapter resolved; streaming began.
    Summarizing,
    /// A token fragment was applied to the streaming text.
    Token,
    Success,
    Error,
}

/// Events sent by the spawned generation task.
enum RunEvent {
    Started,
    Token(String),
    Completed(SummarizationResult),
    Failed(SummarizationError),
}

/// Snapshot of the selection an in-flight run was started from.
struct ActiveRun {
    session_id: SessionId,
    summarized_ids: Vec<MessageId>,
    message_count: usize,
    original_tokens: u32,
}

pub struct SummarizeCoordinator {
    store: SharedSessionStore,
    adapter: Arc<dyn GenerationAdapter>,
    config: EngineConfig,
    catalog: ModelCatalog,
    phase: SummarizePhase,
    streaming_text: String,
    progress: u8,
    tokens_received: u32,
    last_result: Option<SummarizationResult>,
    last_error: Option<SummarizationError>,
    dismissed: bool,
    /// Stamps `summarized_at` on persisted records; injectable so tests can
    /// pin it.
    clock: fn() -> SystemTime,
    /// Single source of truth for "has cancellation been requested" on the
    /// current run; both the consuming task and the abort call site read it.
    cancel: Arc<AtomicBool>,
    events: Option<mpsc::Receiver<RunEvent>>,
    run: Option<ActiveRun>,
}

impl SummarizeCoordinator {
    #[must_use]
    pub fn new(
        store: SharedSessionStore,
        adapter: Arc<dyn GenerationAdapter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            adapter,
            config,
            catalog: ModelCatalog::new(),
            phase: SummarizePhase::Idle,
            streaming_text: String::new(),
            progress: 0,
            tokens_received: 0,
            last_result: None,
            last_error: None,
            dismissed: false,
            clock: SystemTime::now,
            cancel: Arc::new(AtomicBool::new(false)),
            events: None,
            run: None,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the wall clock used to stamp persisted summary records.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn phase(&self) -> SummarizePhase {
        self.phase
    }

    /// Concatenation of all token fragments applied so far, in arrival order.
    #[must_use]
    pub fn streaming_text(&self) -> &str {
        &self.streaming_text
    }

    /// Heuristic progress percentage, capped at [`PROGRESS_DISPLAY_CAP`] until
    /// completion.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&SummarizationResult> {
        self.last_result.as_ref()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&SummarizationError> {
        self.last_error.as_ref()
    }

    /// UI-level flag, orthogonal to the state machine.
    #[must_use]
    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    pub fn dismiss_prompt(&mut self) {
        self.dismissed = true;
    }

    pub fn reset_dismissal(&mut self) {
        self.dismissed = false;
    }

    /// Health of the active session's context against `model`'s window.
    ///
    /// Unknown models fall back to the catalog's conservative default window.
    #[must_use]
    pub fn context_health(&self, model: &str) -> ContextHealth {
        let metrics = match self.store.lock() {
            Ok(store) => store
                .active_session()
                .map(count_session_tokens)
                .unwrap_or_default(),
            Err(_) => {
                tracing::error!("session store lock poisoned; reporting empty metrics");
                ContextMetrics::default()
            }
        };
        let window = self.catalog.context_window_for(model).tokens();
        calculate_context_health(&metrics, window)
    }

    /// Trigger a summarization run.
    ///
    /// Guarded: stays in the current state when a run is already in flight,
    /// when there is no active session, when the session is below the
    /// minimum-keep floor, or when selection yields nothing to summarize.
    pub fn start_summarization(&mut self) -> SummarizeStart {
        if matches!(self.phase, SummarizePhase::Pending | SummarizePhase::Summarizing) {
            return SummarizeStart::NotIdle;
        }

        let (session_id, to_summarize, original_tokens) = {
            let Ok(store) = self.store.lock() else {
                tracing::error!("session store lock poisoned; cannot summarize");
                return SummarizeStart::NoActiveSession;
            };
            let Some(session) = store.active_session() else {
                return SummarizeStart::NoActiveSession;
            };
            if session.messages().len() < self.config.min_keep {
                return SummarizeStart::TooFewMessages;
            }
            let selection = select_for_summarization(
                session.messages(),
                self.config.target_fraction,
                self.config.min_keep,
            );
            if selection.is_empty_scope() {
                return SummarizeStart::NothingToSummarize;
            }
            let original_tokens = selection
                .to_summarize
                .iter()
                .map(|m| estimate_tokens(m.content()))
                .sum();
            (session.id(), selection.to_summarize, original_tokens)
        };

        // New trigger: clear the previous run's outcome and dismissal.
        self.streaming_text.clear();
        self.progress = 0;
        self.tokens_received = 0;
        self.last_result = None;
        self.last_error = None;
        self.dismissed = false;

        let summarized_ids: Vec<MessageId> = to_summarize.iter().map(|m| m.id()).collect();
        let message_count = to_summarize.len();
        tracing::info!(
            session = %session_id,
            message_count,
            original_tokens,
            "starting summarization"
        );

        // Fresh cancellation flag per run; a stale task from an earlier run
        // keeps observing its own flag.
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Arc::clone(&cancel);

        let (tx, rx) = mpsc::channel(RUN_EVENT_CHANNEL_CAPACITY);
        self.events = Some(rx);
        self.run = Some(ActiveRun {
            session_id,
            summarized_ids,
            message_count,
            original_tokens,
        });

        let adapter = Arc::clone(&self.adapter);
        let options = SummarizeOptions {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        tokio::spawn(async move {
            run_generation(adapter, to_summarize, options, cancel, tx).await;
        });

        self.phase = SummarizePhase::Pending;
        SummarizeStart::Started
    }

    /// Cancel an in-flight run and return to idle.
    ///
    /// Signals the generation task and calls the adapter's abort directly
    /// before any state is reset, so no further fragments are processed once
    /// cancellation is requested. Never enters the error state.
    pub fn cancel_summarization(&mut self) {
        if !matches!(self.phase, SummarizePhase::Pending | SummarizePhase::Summarizing) {
            return;
        }
        self.cancel.store(true, Ordering::SeqCst);
        self.adapter.abort();

        self.phase = SummarizePhase::Idle;
        self.streaming_text.clear();
        self.progress = 0;
        self.tokens_received = 0;
        self.events = None;
        self.run = None;
        tracing::info!("summarization cancelled");
    }

    /// Await and apply the next state-machine step.
    ///
    /// Returns `None` when no run is active or the run's event channel closed
    /// without a terminal event (which happens after cancellation).
    pub async fn next_transition(&mut self) -> Option<SummarizeTransition> {
        let event = self.events.as_mut()?.recv().await;
        match event {
            Some(event) => Some(self.apply_event(event)),
            None => {
                self.events = None;
                None
            }
        }
    }

    /// Drive the current run until it reaches a terminal phase.
    #[must_use = "the terminal phase tells you whether the run succeeded"]
    pub async fn run_to_completion(&mut self) -> SummarizePhase {
        while matches!(self.phase, SummarizePhase::Pending | SummarizePhase::Summarizing) {
            if self.next_transition().await.is_none() {
                break;
            }
        }
        self.phase
    }

    fn apply_event(&mut self, event: RunEvent) -> SummarizeTransition {
        match event {
            RunEvent::Started => {
                self.phase = SummarizePhase::Summarizing;
                SummarizeTransition::Summarizing
            }
            RunEvent::Token(text) => {
                self.streaming_text.push_str(&text);
                self.tokens_received += 1;
                // Heuristic: assume ~progress_token_estimate tokens total.
                let estimate = u64::from(self.config.progress_token_estimate.max(1));
                let pct = u64::from(self.tokens_received) * 100 / estimate;
                self.progress = pct.min(u64::from(PROGRESS_DISPLAY_CAP)) as u8;
                if self.phase == SummarizePhase::Pending {
                    self.phase = SummarizePhase::Summarizing;
                }
                SummarizeTransition::Token
            }
            RunEvent::Completed(result) => self.complete(result),
            RunEvent::Failed(err) => {
                tracing::warn!(error = %err, "summarization failed");
                self.last_error = Some(err);
                self.phase = SummarizePhase::Error;
                self.events = None;
                self.run = None;
                SummarizeTransition::Error
            }
        }
    }

    /// Persist the result and finish the run. The store action is invoked
    /// exactly once, at successful completion.
    fn complete(&mut self, result: SummarizationResult) -> SummarizeTransition {
        let Some(run) = self.run.take() else {
            tracing::error!("completion event without an active run");
            self.phase = SummarizePhase::Idle;
            self.events = None;
            return SummarizeTransition::Error;
        };

        let outcome = SummaryOutcome {
            summary: result.summary.clone(),
            summarized_ids: run.summarized_ids,
            original_tokens: run.original_tokens,
            summary_tokens: result.token_count,
        };

        let persisted = match self.store.lock() {
            Ok(mut store) => store
                .record_summary(run.session_id, outcome, (self.clock)())
                .map_err(|e| e.to_string()),
            Err(_) => Err("session store lock poisoned".to_string()),
        };

        if let Err(reason) = persisted {
            // The session mutated under us (or the store is gone); surface as
            // a run failure rather than applying the summary to the wrong
            // messages.
            tracing::warn!(%reason, "failed to persist summary");
            self.last_error = Some(SummarizationError {
                message_count: run.message_count,
                reason,
            });
            self.phase = SummarizePhase::Error;
            self.events = None;
            return SummarizeTransition::Error;
        }

        tracing::info!(
            session = %run.session_id,
            message_count = run.message_count,
            original_tokens = run.original_tokens,
            summary_tokens = result.token_count,
            duration_ms = result.duration_ms(),
            "summarization complete"
        );
        self.last_result = Some(result);
        self.progress = 100;
        self.phase = SummarizePhase::Success;
        self.events = None;
        SummarizeTransition::Success
    }
}

/// The spawned generation task.
///
/// Checks the cancellation flag at the boundary between fragments; once
/// cancellation is observed it aborts the adapter and sends nothing further,
/// suppressing any error the interrupted generation would otherwise raise.
async fn run_generation(
    adapter: Arc<dyn GenerationAdapter>,
    messages: Vec<ember_types::Message>,
    options: SummarizeOptions,
    cancel: Arc<AtomicBool>,
    tx: mpsc::Sender<RunEvent>,
) {
    let mut stream = match summarize_messages(adapter.as_ref(), &messages, options).await {
        Ok(stream) => stream,
        Err(err) => {
            if !cancel.load(Ordering::SeqCst) {
                let _ = tx.send(RunEvent::Failed(err)).await;
            }
            return;
        }
    };

    if cancel.load(Ordering::SeqCst) {
        adapter.abort();
        return;
    }
    if tx.send(RunEvent::Started).await.is_err() {
        return;
    }

    loop {
        if cancel.load(Ordering::SeqCst) {
            adapter.abort();
            return;
        }
        match stream.next_chunk().await {
            Ok(Some(text)) => {
                if cancel.load(Ordering::SeqCst) {
                    adapter.abort();
                    return;
                }
                if tx.send(RunEvent::Token(text)).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(err) => {
                if !cancel.load(Ordering::SeqCst) {
                    let _ = tx.send(RunEvent::Failed(err)).await;
                }
                return;
            }
        }
    }

    if let Some(result) = stream.finish()
        && !cancel.load(Ordering::SeqCst)
    {
        let _ = tx.send(RunEvent::Completed(result)).await;
    }
}
