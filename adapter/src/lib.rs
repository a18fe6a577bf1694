//! Generation adapter boundary.
//!
//! Model inference runs in a native runtime outside this process. Everything
//! this crate knows about it is the request/stream/abort shape: submit a
//! [`GenerateRequest`], pull [`TokenFragment`]s from the returned stream until
//! it completes or fails, and call [`GenerationAdapter::abort`] to halt an
//! in-progress generation. Transport details (process boundary, serialization)
//! live behind the trait.
//!
//! No implementation in this crate performs network IO of its own; the
//! [`scripted`] module provides a deterministic in-process adapter for tests
//! and the demo driver.

mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use scripted::ScriptedAdapter;

/// A generation request handed to the native runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl GenerateRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            stop_sequences: None,
        }
    }
}

/// One token fragment produced by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFragment {
    pub text: String,
}

impl TokenFragment {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The runtime reported a failure (model not loaded, inference error, ...).
    #[error("generation runtime error: {0}")]
    Runtime(String),
    /// The event stream dropped mid-generation without a terminal event.
    #[error("generation stream disconnected")]
    Disconnected,
}

/// A lazy, finite, non-restartable sequence of token fragments.
///
/// One generation run can be consumed once; `Ok(None)` signals exhaustion.
#[async_trait]
pub trait TokenStream: Send {
    async fn next_fragment(&mut self) -> Result<Option<TokenFragment>, AdapterError>;
}

/// The external generation capability.
///
/// `abort` is idempotent and safe to call when no generation is in flight.
#[async_trait]
pub trait GenerationAdapter: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<Box<dyn TokenStream>, AdapterError>;

    fn abort(&self);
}
