//! Conversation history for the support chat.
//!
//! - [`InMemoryHistory`]: process-lifetime, session-keyed turns for `/api/query`.
//! - [`RedisHistory`]: persistent per-session message log for `/api/messages`.
//!
//! Both implement [`HistoryStore`], the seam the API uses to persist and
//! reload messages.

mod errors;
mod memory;
mod record;
mod redis_store;

use async_trait::async_trait;

pub use errors::{HistoryError, Result};
pub use memory::InMemoryHistory;
pub use record::{ChatRecord, Role, Turn, turns_from_records};
pub use redis_store::{DEFAULT_KEY_PREFIX, RedisHistory};

/// Append-only message log keyed by session id.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one message to its session.
    async fn append(&self, record: &ChatRecord) -> Result<()>;

    /// Loads a session's messages, oldest first.
    async fn load(&self, session_id: &str) -> Result<Vec<ChatRecord>>;
}
