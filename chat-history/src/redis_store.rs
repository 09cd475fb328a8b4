//! Redis-backed persistent history.
//!
//! Layout: one list per session at `message_store:<session_id>`; each element
//! is a JSON-encoded [`ChatRecord`]. Appends use `RPUSH`, so `LRANGE 0 -1`
//! returns messages oldest first.
//!
//! One multiplexed connection is shared by all requests. When the server
//! drops it (restart, idle timeout) the connection is discarded and the next
//! command opens a new one. Loads are retried once on the new connection;
//! appends are not, so a message is never stored twice.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use redis::{AsyncCommands, RedisError, aio::MultiplexedConnection};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::{
    HistoryStore,
    errors::{HistoryError, Result},
    memory::ensure_session,
    record::ChatRecord,
};

pub const DEFAULT_KEY_PREFIX: &str = "message_store:";

pub struct RedisHistory {
    client: redis::Client,
    key_prefix: String,
    conn: Mutex<Option<Shared>>,
    generation: AtomicU64,
}

/// The live connection plus a counter telling reconnects apart, so a stale
/// failure cannot discard a connection opened after it.
struct Shared {
    generation: u64,
    conn: MultiplexedConnection,
}

impl RedisHistory {
    /// Parses the connection string (`redis://`, `rediss://`, `unix://`).
    /// No network traffic happens until the first append or load.
    ///
    /// # Errors
    /// [`HistoryError::InvalidConnectionString`] when the URL cannot be parsed.
    pub fn open(connection_string: &str) -> Result<Self> {
        let client = redis::Client::open(connection_string.trim())
            .map_err(|e| HistoryError::InvalidConnectionString(e.to_string()))?;
        Ok(Self {
            client,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            conn: Mutex::new(None),
            generation: AtomicU64::new(0),
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn key_for(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    async fn connection(&self) -> Result<(u64, MultiplexedConnection)> {
        let mut slot = self.conn.lock().await;
        if let Some(shared) = slot.as_ref() {
            return Ok((shared.generation, shared.conn.clone()));
        }
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(generation, "opening redis connection");
        let conn = self.client.get_multiplexed_async_connection().await?;
        *slot = Some(Shared {
            generation,
            conn: conn.clone(),
        });
        Ok((generation, conn))
    }

    /// Forgets the connection of `generation` if it is still the current one.
    async fn discard(&self, generation: u64, cause: &RedisError) {
        let mut slot = self.conn.lock().await;
        if slot.as_ref().is_some_and(|s| s.generation == generation) {
            warn!(generation, error = %cause, "redis connection lost; reconnecting on next use");
            *slot = None;
        }
    }

    async fn lrange_all(&self, key: &str) -> Result<Vec<String>> {
        let (generation, mut conn) = self.connection().await?;
        match conn.lrange::<_, Vec<String>>(key, 0, -1).await {
            Ok(raw) => Ok(raw),
            Err(e) if connection_lost(&e) => {
                self.discard(generation, &e).await;
                let (_, mut conn) = self.connection().await?;
                Ok(conn.lrange::<_, Vec<String>>(key, 0, -1).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn connection_lost(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped()
}

#[async_trait]
impl HistoryStore for RedisHistory {
    #[instrument(skip_all, fields(session = %record.session_id, role = ?record.role))]
    async fn append(&self, record: &ChatRecord) -> Result<()> {
        ensure_session(&record.session_id)?;
        let payload = serde_json::to_string(record)?;
        let (generation, mut conn) = self.connection().await?;
        let pushed: redis::RedisResult<()> =
            conn.rpush(self.key_for(&record.session_id), payload).await;
        if let Err(e) = pushed {
            if connection_lost(&e) {
                self.discard(generation, &e).await;
            }
            return Err(e.into());
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, session_id: &str) -> Result<Vec<ChatRecord>> {
        ensure_session(session_id)?;
        let raw = self.lrange_all(&self.key_for(session_id)).await?;
        let records = raw
            .iter()
            .map(|s| serde_json::from_str::<ChatRecord>(s))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(messages = records.len(), "history loaded");
        Ok(records)
    }
}
