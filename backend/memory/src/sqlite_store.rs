//! SQLite-backed durable history store.
//!
//! One row per conversation in a `chat_history` table, keyed `chat_<id>`,
//! holding the JSON-encoded [`HistoryRecord`]. Appends run inside an
//! immediate-mode write transaction so the read, append, truncate and write
//! steps commit together or not at all.
//!
//! All statements run on tokio's blocking pool. A caller that stops waiting
//! does not abort the transaction; it still commits or rolls back whole.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use grokgram_core::{
    BotError, ConversationHistory, ConversationId, DEFAULT_MAX_HISTORY, HistoryEntry,
};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info};

use crate::record::HistoryRecord;
use crate::store::HistoryStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS chat_history (
     key        TEXT PRIMARY KEY,
     value      TEXT NOT NULL,
     updated_at INTEGER NOT NULL
 );";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
    max_history: usize,
}

impl SqliteHistoryStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BotError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BotError::StorageUnavailable(format!(
                    "cannot create {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            BotError::StorageUnavailable(format!("cannot open {}: {e}", path.display()))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .and_then(|_| conn.execute_batch("PRAGMA journal_mode=WAL;"))
            .and_then(|_| conn.execute_batch(SCHEMA))
            .map_err(|e| BotError::StorageUnavailable(format!("cannot initialize schema: {e}")))?;

        info!(path = %path.display(), "History store opened");
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self, BotError> {
        let conn = Connection::open_in_memory()
            .and_then(|conn| conn.execute_batch(SCHEMA).map(|_| conn))
            .map_err(|e| BotError::StorageUnavailable(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(1);
        self
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, BotError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, BotError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| BotError::storage_io("connection lock poisoned"))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| BotError::storage_io(format!("storage task failed: {e}")))?
    }
}

fn read_record(conn: &Connection, key: &str) -> Result<Option<HistoryRecord>, BotError> {
    conn.query_row(
        "SELECT value FROM chat_history WHERE key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(BotError::storage_io)?
    .map(|raw| HistoryRecord::decode(&raw))
    .transpose()
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    fn max_history(&self) -> usize {
        self.max_history
    }

    async fn load(&self, id: ConversationId) -> Result<ConversationHistory, BotError> {
        let key = id.storage_key();
        self.with_conn(move |conn| {
            Ok(read_record(conn, &key)?
                .map(|record| record.history)
                .unwrap_or_default())
        })
        .await
    }

    async fn append(&self, id: ConversationId, entry: HistoryEntry) -> Result<(), BotError> {
        let key = id.storage_key();
        let max_history = self.max_history;
        self.with_conn(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(BotError::storage_io)?;

            let mut record = read_record(&tx, &key)?.unwrap_or_default();
            record.push_bounded(entry, max_history);

            tx.execute(
                "INSERT INTO chat_history (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, record.encode()?, chrono::Utc::now().timestamp()],
            )
            .map_err(BotError::storage_io)?;
            tx.commit().map_err(BotError::storage_io)?;

            debug!(key = %key, len = record.history.len(), "Appended history entry");
            Ok(())
        })
        .await
    }

    async fn clear(&self, id: ConversationId) -> Result<(), BotError> {
        let key = id.storage_key();
        self.with_conn(move |conn| {
            let removed = conn
                .execute("DELETE FROM chat_history WHERE key = ?1", params![key])
                .map_err(BotError::storage_io)?;
            debug!(key = %key, removed, "Cleared history");
            Ok(())
        })
        .await
    }

    async fn conversations(&self) -> Result<Vec<ConversationId>, BotError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT key FROM chat_history")
                .map_err(BotError::storage_io)?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(BotError::storage_io)?
                .collect::<rusqlite::Result<Vec<String>>>()
                .map_err(BotError::storage_io)?;

            let mut ids: Vec<ConversationId> = keys
                .iter()
                .filter_map(|key| ConversationId::from_storage_key(key))
                .collect();
            ids.sort();
            Ok(ids)
        })
        .await
    }
}
