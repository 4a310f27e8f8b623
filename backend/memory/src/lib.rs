pub mod record;
pub mod sqlite_store;
pub mod store;

pub use record::HistoryRecord;
pub use sqlite_store::SqliteHistoryStore;
pub use store::{HistoryStore, InMemoryHistoryStore};
