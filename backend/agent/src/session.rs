//! Session coordination over the shared history store.
//!
//! The coordinator owns the store handle and opens it at most once, on first
//! use or when warmed at startup. A failed open is remembered: every later
//! call reports the same `StorageUnavailable` and the process is expected to
//! stop. It does not serialize calls across conversations; atomicity per
//! conversation is the store's job.

use std::sync::Arc;

use grokgram_core::{BotError, ConversationHistory, ConversationId};
use grokgram_memory::HistoryStore;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

type StoreOpener = Arc<dyn Fn() -> Result<Arc<dyn HistoryStore>, BotError> + Send + Sync>;

pub struct SessionCoordinator {
    /// Outcome of the single open attempt; the error text on failure.
    store: OnceCell<Result<Arc<dyn HistoryStore>, String>>,
    opener: Option<StoreOpener>,
}

impl SessionCoordinator {
    /// Coordinator over an already opened store.
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store: OnceCell::new_with(Some(Ok(store))),
            opener: None,
        }
    }

    /// Coordinator that opens its store on first use.
    ///
    /// Concurrent first callers wait on a single run of `opener`. If it
    /// fails, the coordinator stays unavailable for its whole lifetime.
    pub fn lazy<F>(opener: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn HistoryStore>, BotError> + Send + Sync + 'static,
    {
        Self {
            store: OnceCell::new(),
            opener: Some(Arc::new(opener)),
        }
    }

    async fn store(&self) -> Result<&Arc<dyn HistoryStore>, BotError> {
        let opened = self
            .store
            .get_or_init(|| async {
                let Some(opener) = self.opener.clone() else {
                    return Err("no history store configured".to_string());
                };
                let opened = match tokio::task::spawn_blocking(move || opener()).await {
                    Ok(Ok(store)) => Ok(store),
                    Ok(Err(BotError::StorageUnavailable(msg))) => Err(msg),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                match &opened {
                    Ok(store) => {
                        info!(max_history = store.max_history(), "History store initialized")
                    }
                    Err(msg) => error!(error = %msg, "History store failed to open"),
                }
                opened
            })
            .await;
        opened
            .as_ref()
            .map_err(|msg| BotError::StorageUnavailable(msg.clone()))
    }

    /// Open the store now so that a broken database fails the process at startup.
    pub async fn ensure_ready(&self) -> Result<(), BotError> {
        self.store().await.map(|_| ())
    }

    /// History for `id`, oldest first.
    ///
    /// I/O failures degrade to an empty history so the turn can proceed. Only
    /// an unavailable store is returned as an error.
    pub async fn get_history(&self, id: ConversationId) -> Result<ConversationHistory, BotError> {
        match self.store().await?.load(id).await {
            Ok(history) => Ok(history),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    conversation = %id,
                    error = %e,
                    "Failed to load history; continuing without it"
                );
                Ok(ConversationHistory::new())
            }
        }
    }

    /// Append a reply, truncating to the store's retention bound in the same transaction.
    pub async fn record_reply(
        &self,
        id: ConversationId,
        reply: impl Into<String>,
    ) -> Result<(), BotError> {
        self.store().await?.append(id, reply.into()).await.inspect_err(|e| {
            error!(conversation = %id, error = %e, "Failed to record reply");
        })
    }

    pub async fn reset_session(&self, id: ConversationId) -> Result<(), BotError> {
        self.store().await?.clear(id).await.inspect_err(|e| {
            error!(conversation = %id, error = %e, "Failed to clear history");
        })
    }

    pub async fn conversations(&self) -> Result<Vec<ConversationId>, BotError> {
        self.store().await?.conversations().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use grokgram_core::HistoryEntry;
    use grokgram_memory::{InMemoryHistoryStore, SqliteHistoryStore};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose every operation fails with an I/O error.
    struct BrokenStore;

    #[async_trait]
    impl HistoryStore for BrokenStore {
        fn max_history(&self) -> usize {
            10
        }
        async fn load(&self, _id: ConversationId) -> Result<ConversationHistory, BotError> {
            Err(BotError::storage_io("disk gone"))
        }
        async fn append(&self, _id: ConversationId, _e: HistoryEntry) -> Result<(), BotError> {
            Err(BotError::storage_io("disk gone"))
        }
        async fn clear(&self, _id: ConversationId) -> Result<(), BotError> {
            Err(BotError::storage_io("disk gone"))
        }
        async fn conversations(&self) -> Result<Vec<ConversationId>, BotError> {
            Err(BotError::storage_io("disk gone"))
        }
    }

    fn coordinator() -> SessionCoordinator {
        SessionCoordinator::new(Arc::new(InMemoryHistoryStore::new()))
    }

    #[tokio::test]
    async fn test_bound_holds_after_every_reply() {
        let sessions = coordinator();
        let id = ConversationId(1);
        for n in 1..=25 {
            sessions.record_reply(id, format!("r{n}")).await.unwrap();
            let history = sessions.get_history(id).await.unwrap();
            let keep = n.min(10);
            let expected: Vec<String> = (n - keep + 1..=n).map(|i| format!("r{i}")).collect();
            assert_eq!(history, expected);
        }
    }

    #[tokio::test]
    async fn test_reset_then_record() {
        let sessions = coordinator();
        let id = ConversationId(2);
        sessions.record_reply(id, "old").await.unwrap();
        sessions.reset_session(id).await.unwrap();
        assert!(sessions.get_history(id).await.unwrap().is_empty());

        sessions.record_reply(id, "x").await.unwrap();
        assert_eq!(sessions.get_history(id).await.unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_reset_absent_conversation() {
        let sessions = coordinator();
        sessions.reset_session(ConversationId(404)).await.unwrap();
        assert!(sessions.get_history(ConversationId(404)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_errors_degrade_write_errors_surface() {
        let sessions = SessionCoordinator::new(Arc::new(BrokenStore));
        let id = ConversationId(3);
        assert!(sessions.get_history(id).await.unwrap().is_empty());
        assert!(matches!(
            sessions.record_reply(id, "x").await,
            Err(BotError::StorageIo(_))
        ));
        assert!(matches!(
            sessions.reset_session(id).await,
            Err(BotError::StorageIo(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_opens_once() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opened);
        let sessions = Arc::new(SessionCoordinator::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(InMemoryHistoryStore::new()) as Arc<dyn HistoryStore>)
        }));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let sessions = Arc::clone(&sessions);
                tokio::spawn(async move { sessions.record_reply(ConversationId(i), "hello").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(sessions.conversations().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_failed_open_stays_unavailable() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let sessions = SessionCoordinator::lazy(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(BotError::storage_io("cannot open"))
            } else {
                Ok(Arc::new(InMemoryHistoryStore::new()) as Arc<dyn HistoryStore>)
            }
        });

        let first = sessions.record_reply(ConversationId(1), "x").await.unwrap_err();
        assert!(matches!(first, BotError::StorageUnavailable(_)));
        assert!(first.is_fatal());

        let second = sessions.record_reply(ConversationId(1), "y").await.unwrap_err();
        assert!(matches!(second, BotError::StorageUnavailable(ref m) if m.contains("cannot open")));
        assert!(sessions.get_history(ConversationId(1)).await.unwrap_err().is_fatal());
        assert!(sessions.ensure_ready().await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replies_same_conversation() {
        let sessions = Arc::new(SessionCoordinator::new(Arc::new(
            SqliteHistoryStore::in_memory().unwrap(),
        )));
        let id = ConversationId(99);

        let handles: Vec<_> = (0..24)
            .map(|i| {
                let sessions = Arc::clone(&sessions);
                tokio::spawn(async move { sessions.record_reply(id, format!("e{i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = sessions.get_history(id).await.unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history.iter().collect::<HashSet<_>>().len(), 10);
    }
}
