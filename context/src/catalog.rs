//! Context-window catalog for local model families.
//!
//! The native runtime reports a model identifier (usually derived from a GGUF
//! filename); this module resolves it to a context-window size via prefix
//! matching, with an explicit conservative fallback for unknown models.

use std::collections::HashMap;

/// Conservative fallback for models the catalog does not know.
pub const DEFAULT_CONTEXT_WINDOW: u32 = 2048;

/// Where a resolved context window came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// Exact match from an override.
    Override,
    /// Matched a known prefix (the matched prefix).
    Prefix(&'static str),
    /// Fell back to [`DEFAULT_CONTEXT_WINDOW`] because no match was found.
    DefaultFallback,
}

/// Result of a context-window lookup.
///
/// Makes the "fallback OR real data" decision explicit at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedContextWindow {
    tokens: u32,
    source: CatalogSource,
}

impl ResolvedContextWindow {
    #[must_use]
    pub const fn new(tokens: u32, source: CatalogSource) -> Self {
        Self { tokens, source }
    }

    #[must_use]
    pub const fn tokens(self) -> u32 {
        self.tokens
    }

    #[must_use]
    pub const fn source(self) -> CatalogSource {
        self.source
    }
}

/// Known model-family prefixes and their context windows.
///
/// Ordered by specificity (more specific prefixes first) so that identifiers
/// like `llama-3.2-3b-instruct-q4` match their family before a shorter prefix
/// could.
const KNOWN_MODELS: &[(&str, u32)] = &[
    ("llama-3.2", 131_072),
    ("llama-3.1", 131_072),
    ("llama-3", 8_192),
    ("llama-2", 4_096),
    ("mistral-7b", 32_768),
    ("mixtral-8x7b", 32_768),
    ("phi-3-mini", 4_096),
    ("phi-3", 131_072),
    ("qwen2.5", 32_768),
    ("gemma-2", 8_192),
    ("tinyllama", 2_048),
];

/// Prefix-matched lookup of model context windows with custom overrides.
///
/// Lookup order: exact override, then prefix match against known families,
/// then [`DEFAULT_CONTEXT_WINDOW`] with an explicit `DefaultFallback` source.
/// Matching is case-insensitive because GGUF filenames vary in casing.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    overrides: HashMap<String, u32>,
}

impl ModelCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn context_window_for(&self, model: &str) -> ResolvedContextWindow {
        if let Some(&tokens) = self.overrides.get(model) {
            return ResolvedContextWindow::new(tokens, CatalogSource::Override);
        }

        let normalized = model.to_ascii_lowercase();
        for (prefix, tokens) in KNOWN_MODELS {
            if normalized.starts_with(prefix) {
                return ResolvedContextWindow::new(*tokens, CatalogSource::Prefix(prefix));
            }
        }

        tracing::debug!(model, "unknown model; using conservative context window");
        ResolvedContextWindow::new(DEFAULT_CONTEXT_WINDOW, CatalogSource::DefaultFallback)
    }

    pub fn set_override(&mut self, model: impl Into<String>, context_window: u32) {
        self.overrides.insert(model.into(), context_window);
    }
}
