//! Ember CLI - demo driver for the context-health and summarization engine.
//!
//! Seeds a conversation, reports its context health against a model's window,
//! then drives a full summarization run against a scripted adapter and prints
//! each state transition as it happens:
//!
//! ```text
//! main() -> seed session -> health report -> start_summarization()
//!                                                  |
//!                                   next_transition() loop -> health report
//! ```
//!
//! The model is taken from `EMBER_MODEL` (default `llama-3.2-3b-instruct`);
//! an optional first argument names a config TOML to load instead of
//! `~/.ember/config.toml`.

use std::env;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use ember_adapter::ScriptedAdapter;
use ember_engine::{
    EngineConfig, SessionStore, SummarizeCoordinator, SummarizePhase, SummarizeStart,
    SummarizeTransition,
};
use ember_types::{ContextHealth, Role};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    // Stdout carries the demo output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

const SEED_EXCHANGES: &[(&str, &str)] = &[
    (
        "I'm building a small home server and trying to decide between running \
         everything in containers or using systemd services directly.",
        "Containers give you isolation and reproducible deployments; systemd units \
         are simpler to inspect and debug. For a small home server a hybrid works \
         well: containerize third-party services, run your own scripts as units.",
    ),
    (
        "What about storage? I have two 4TB drives.",
        "With two drives you can mirror them for redundancy or pool them for \
         capacity. Mirroring halves your space but survives a single drive \
         failure, which matters more for data you cannot re-download.",
    ),
    (
        "Let's go with mirroring. How should I handle backups on top of that?",
        "A mirror is not a backup: it protects against drive failure, not \
         deletion or corruption. Add periodic snapshots plus an off-site copy of \
         anything irreplaceable.",
    ),
    (
        "Can you summarize what we've decided so far?",
        "So far: hybrid service management, mirrored 4TB drives, and snapshots \
         with an off-site copy for irreplaceable data.",
    ),
    (
        "Great. Next topic: what should I monitor?",
        "Start with disk health (SMART), free space, and failed systemd units or \
         container restarts. Alerting on those three covers most home-server \
         failures.",
    ),
];

/// The fragment script the demo adapter replays as its "generated" summary.
const SCRIPTED_SUMMARY: &[&str] = &[
    "The user ",
    "is setting up ",
    "a home server: ",
    "hybrid container/systemd ",
    "services, mirrored ",
    "4TB drives, snapshot ",
    "plus off-site backups, ",
    "and SMART/space/unit ",
    "monitoring.",
];

fn print_health(label: &str, health: &ContextHealth) {
    println!(
        "{label}: {} ({:.1}% of {} tokens, {} messages, {} tokens used)",
        health.status.as_str(),
        health.percentage,
        health.max_context_length,
        health.message_count,
        health.tokens_used,
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = match env::args().nth(1) {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => EngineConfig::load_default().context("failed to load config")?,
    };
    let model = env::var("EMBER_MODEL").unwrap_or_else(|_| "llama-3.2-3b-instruct".to_string());
    tracing::info!(
        %model,
        target_fraction = config.target_fraction,
        min_keep = config.min_keep,
        "starting demo run"
    );

    let mut store = SessionStore::new();
    let now = SystemTime::now();
    let session_id = store.create_session("home server planning", now);
    for (question, answer) in SEED_EXCHANGES {
        store.append_message(session_id, Role::User, *question, now)?;
        store.append_message(session_id, Role::Assistant, *answer, now)?;
    }
    let store = store.into_shared();

    let adapter =
        ScriptedAdapter::new(SCRIPTED_SUMMARY.iter().copied()).with_fragment_delay(Duration::from_millis(40));
    let mut coordinator = SummarizeCoordinator::new(Arc::clone(&store), Arc::new(adapter), config);

    print_health("before", &coordinator.context_health(&model));

    match coordinator.start_summarization() {
        SummarizeStart::Started => {}
        refused => bail!("summarization did not start: {refused:?}"),
    }

    println!("summarizing...");
    while let Some(transition) = coordinator.next_transition().await {
        match transition {
            SummarizeTransition::Summarizing => println!("  [streaming]"),
            SummarizeTransition::Token => {
                println!(
                    "  [{:>3}%] {}",
                    coordinator.progress(),
                    coordinator.streaming_text()
                );
            }
            SummarizeTransition::Success => break,
            SummarizeTransition::Error => {
                let err = coordinator
                    .last_error()
                    .context("error state without a recorded error")?;
                bail!("summarization failed: {err}");
            }
        }
    }

    if coordinator.phase() != SummarizePhase::Success {
        bail!("summarization ended in {:?}", coordinator.phase());
    }
    let result = coordinator
        .last_result()
        .context("success state without a recorded result")?;
    println!(
        "done in {}ms: {} tokens",
        result.duration_ms(),
        result.token_count
    );

    {
        let store = store
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        let session = store.session(session_id).context("session vanished")?;
        let record = session.summary().context("summary not persisted")?;
        println!(
            "folded {} messages ({} tokens) into a {}-token summary; {} messages kept",
            record.message_count,
            record.original_tokens,
            record.summary_tokens,
            session.messages().len(),
        );
        println!("summary: {}", record.summary);
    }

    print_health("after", &coordinator.context_health(&model));

    Ok(())
}
