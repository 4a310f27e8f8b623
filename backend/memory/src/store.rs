use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use grokgram_core::{
    BotError, ConversationHistory, ConversationId, DEFAULT_MAX_HISTORY, HistoryEntry,
};

use crate::record::HistoryRecord;

/// Durable mapping from conversation to its bounded reply history.
///
/// Every mutation is atomic: no caller can observe a record that has been
/// appended to but not yet truncated.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Maximum number of entries retained per conversation.
    fn max_history(&self) -> usize;

    /// Stored history, oldest first. A missing record is an empty history.
    async fn load(&self, id: ConversationId) -> Result<ConversationHistory, BotError>;

    /// Append `entry` and truncate to [`max_history`](Self::max_history) in one transaction.
    async fn append(&self, id: ConversationId, entry: HistoryEntry) -> Result<(), BotError>;

    /// Remove the record for `id`. Clearing an absent id is not an error.
    async fn clear(&self, id: ConversationId) -> Result<(), BotError>;

    /// Conversations that currently have a stored record.
    async fn conversations(&self) -> Result<Vec<ConversationId>, BotError>;
}

/// Process-local store for tests and ephemeral runs.
pub struct InMemoryHistoryStore {
    records: Arc<RwLock<HashMap<ConversationId, HistoryRecord>>>,
    max_history: usize,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            max_history: max_history.max(1),
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> BotError {
    BotError::storage_io("history lock poisoned")
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    fn max_history(&self) -> usize {
        self.max_history
    }

    async fn load(&self, id: ConversationId) -> Result<ConversationHistory, BotError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&id).map(|r| r.history.clone()).unwrap_or_default())
    }

    async fn append(&self, id: ConversationId, entry: HistoryEntry) -> Result<(), BotError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .entry(id)
            .or_default()
            .push_bounded(entry, self.max_history);
        Ok(())
    }

    async fn clear(&self, id: ConversationId) -> Result<(), BotError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.remove(&id);
        Ok(())
    }

    async fn conversations(&self) -> Result<Vec<ConversationId>, BotError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut ids: Vec<ConversationId> = records.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
