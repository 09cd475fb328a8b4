//! In-process, session-keyed history.
//!
//! All sessions live in one map behind a `tokio::sync::RwLock`. Writers take
//! the write lock for the whole turn, so concurrent requests never lose an
//! update and each returned snapshot is a consistent prefix of the session.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    HistoryStore,
    errors::{HistoryError, Result},
    record::{ChatRecord, Turn, turns_from_records},
};

#[derive(Debug, Default)]
pub struct InMemoryHistory {
    sessions: RwLock<HashMap<String, Vec<ChatRecord>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one (question, answer) turn and returns the session's turns,
    /// the new one last.
    pub async fn append_turn(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<Vec<Turn>> {
        ensure_session(session_id)?;
        let mut w = self.sessions.write().await;
        let log = w.entry(session_id.to_string()).or_default();
        log.push(ChatRecord::user(session_id, question));
        log.push(ChatRecord::assistant(session_id, answer));
        let turns = turns_from_records(log);
        debug!(session = session_id, turns = turns.len(), "turn appended");
        Ok(turns)
    }

    /// Current turns of a session (empty for unknown sessions).
    pub async fn turns(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|log| turns_from_records(log))
            .unwrap_or_default()
    }

    /// Number of sessions with at least one record.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, record: &ChatRecord) -> Result<()> {
        ensure_session(&record.session_id)?;
        self.sessions
            .write()
            .await
            .entry(record.session_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Vec<ChatRecord>> {
        ensure_session(session_id)?;
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub(crate) fn ensure_session(session_id: &str) -> Result<()> {
    if session_id.trim().is_empty() {
        Err(HistoryError::EmptySession)
    } else {
        Ok(())
    }
}
