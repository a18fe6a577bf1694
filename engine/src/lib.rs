//! Orchestration layer: session store, summarizer, and the coordinator state
//! machine that ties context health to streaming summarization.

pub mod config;
pub mod coordinator;
pub mod store;
pub mod summarizer;

pub use config::{ConfigError, EngineConfig};
pub use coordinator::{
    PROGRESS_DISPLAY_CAP, SummarizeCoordinator, SummarizePhase, SummarizeStart,
    SummarizeTransition,
};
pub use store::{SessionStore, SharedSessionStore, StoreError};
pub use summarizer::{
    SummarizationError, SummarizeOptions, SummaryStream, build_summary_prompt, summarize_messages,
};
