//! Session store: process-wide session state behind explicit actions.
//!
//! The store is an injectable container, not a module-level singleton: the
//! coordinator receives a [`SharedSessionStore`] handle and mutates sessions
//! only through the actions defined here. Recording a summarization result is
//! a single atomic action so a session is never observed half-summarized.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ember_types::{
    Message, MessageId, Role, Session, SessionId, SummaryApplyError, SummaryOutcome, SummaryRecord,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    #[error(transparent)]
    Summary(#[from] SummaryApplyError),
}

/// Shared handle passed to the coordinator and any UI layer.
pub type SharedSessionStore = Arc<Mutex<SessionStore>>;

/// All sessions plus the active-session pointer.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionStore {
    sessions: Vec<Session>,
    active: Option<SessionId>,
    next_session_id: u64,
    next_message_id: u64,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a store in the shared handle the coordinator expects.
    #[must_use]
    pub fn into_shared(self) -> SharedSessionStore {
        Arc::new(Mutex::new(self))
    }

    /// Create a session and make it active.
    pub fn create_session(&mut self, title: impl Into<String>, now: SystemTime) -> SessionId {
        let id = SessionId::new(self.next_session_id);
        self.next_session_id += 1;
        self.sessions.push(Session::new(id, title, now));
        self.active = Some(id);
        id
    }

    pub fn set_active(&mut self, id: SessionId) -> Result<(), StoreError> {
        if self.sessions.iter().any(|s| s.id() == id) {
            self.active = Some(id);
            Ok(())
        } else {
            Err(StoreError::UnknownSession(id))
        }
    }

    #[must_use]
    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active
    }

    #[must_use]
    pub fn active_session(&self) -> Option<&Session> {
        self.active.and_then(|id| self.session(id))
    }

    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut Session, StoreError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(StoreError::UnknownSession(id))
    }

    /// Append a message to a session. Ids are store-assigned and unique.
    pub fn append_message(
        &mut self,
        session_id: SessionId,
        role: Role,
        content: impl Into<String>,
        now: SystemTime,
    ) -> Result<MessageId, StoreError> {
        let id = MessageId::new(self.next_message_id);
        // Reserve the id before the borrow of the session.
        self.next_message_id += 1;
        let session = self.session_mut(session_id)?;
        session.push_message(Message::new(id, role, content, now), now);
        Ok(id)
    }

    /// Atomically record a summarization result against a session.
    ///
    /// Replaces the summarized prefix with a summary record while retaining
    /// the originals for later expansion. Rejected (leaving the session
    /// untouched) if the prefix no longer matches — the session mutated under
    /// an in-flight run.
    pub fn record_summary(
        &mut self,
        session_id: SessionId,
        outcome: SummaryOutcome,
        now: SystemTime,
    ) -> Result<(), StoreError> {
        let session = self.session_mut(session_id)?;
        session.apply_summary(outcome, now)?;
        Ok(())
    }

    /// Restore a session's summarized originals, returning the record.
    pub fn expand_summary(
        &mut self,
        session_id: SessionId,
        now: SystemTime,
    ) -> Result<SummaryRecord, StoreError> {
        let session = self.session_mut(session_id)?;
        Ok(session.expand_summary(now)?)
    }

    /// Save all sessions to a JSON file.
    ///
    /// Write-temp-then-rename so a crash mid-write never clobbers the
    /// previous snapshot.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("serialize session store")?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json.as_bytes())
            .with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
        Ok(())
    }

    /// Load sessions from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let store = serde_json::from_str(&json).context("parse session store")?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    fn store_with_session(message_count: usize) -> (SessionStore, SessionId) {
        let mut store = SessionStore::new();
        let id = store.create_session("chat", now());
        for i in 0..message_count {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append_message(id, role, format!("message {i}"), now())
                .expect("session exists");
        }
        (store, id)
    }

    #[test]
    fn create_session_becomes_active() {
        let (store, id) = store_with_session(0);
        assert_eq!(store.active_session_id(), Some(id));
        assert_eq!(store.active_session().map(Session::id), Some(id));
    }

    #[test]
    fn message_ids_are_unique_across_appends() {
        let (store, id) = store_with_session(5);
        let session = store.session(id).expect("present");
        let mut ids: Vec<u64> = session.messages().iter().map(|m| m.id().value()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn append_to_unknown_session_fails() {
        let mut store = SessionStore::new();
        let err = store
            .append_message(SessionId::new(42), Role::User, "hi", now())
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownSession(SessionId::new(42)));
    }

    #[test]
    fn set_active_requires_existing_session() {
        let (mut store, id) = store_with_session(0);
        assert!(store.set_active(id).is_ok());
        assert!(store.set_active(SessionId::new(99)).is_err());
    }

    #[test]
    fn record_summary_replaces_prefix_once() {
        let (mut store, id) = store_with_session(6);
        let ids: Vec<MessageId> = store.session(id).expect("present").messages()[..3]
            .iter()
            .map(Message::id)
            .collect();

        store
            .record_summary(
                id,
                SummaryOutcome {
                    summary: "short".to_string(),
                    summarized_ids: ids,
                    original_tokens: 30,
                    summary_tokens: 2,
                },
                now(),
            )
            .expect("record");

        let session = store.session(id).expect("present");
        assert_eq!(session.messages().len(), 3);
        let record = session.summary().expect("record");
        assert_eq!(record.summary, "short");
        assert_eq!(record.message_count, 3);

        // A second application is rejected.
        let err = store
            .record_summary(
                id,
                SummaryOutcome {
                    summary: "again".to_string(),
                    summarized_ids: vec![MessageId::new(3)],
                    original_tokens: 10,
                    summary_tokens: 1,
                },
                now(),
            )
            .unwrap_err();
        assert_eq!(err, StoreError::Summary(SummaryApplyError::AlreadySummarized));
    }

    #[test]
    fn expand_restores_messages() {
        let (mut store, id) = store_with_session(6);
        let ids: Vec<MessageId> = store.session(id).expect("present").messages()[..3]
            .iter()
            .map(Message::id)
            .collect();
        store
            .record_summary(
                id,
                SummaryOutcome {
                    summary: "short".to_string(),
                    summarized_ids: ids,
                    original_tokens: 30,
                    summary_tokens: 2,
                },
                now(),
            )
            .expect("record");

        let record = store.expand_summary(id, now()).expect("expand");
        assert_eq!(record.message_count, 3);
        assert_eq!(store.session(id).expect("present").messages().len(), 6);
    }

    #[test]
    fn save_load_roundtrip() {
        let (store, id) = store_with_session(4);

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("sessions.json");
        store.save(&path).expect("save");

        let loaded = SessionStore::load(&path).expect("load");
        assert_eq!(loaded.active_session_id(), Some(id));
        assert_eq!(loaded.session(id).expect("present").messages().len(), 4);

        // Ids continue past the loaded ones.
        let mut loaded = loaded;
        let next = loaded
            .append_message(id, Role::User, "new", now())
            .expect("append");
        assert_eq!(next.value(), 4);
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(SessionStore::load("/nonexistent/sessions.json").is_err());
    }
}
