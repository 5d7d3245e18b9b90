//! Key-value persistence shared by the counter and the statistics recorder.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};

use crate::error::StoreError;

mod json_file;

pub use json_file::JsonFileStore;

pub mod keys {
    pub const QUIZ_STATS: &str = "quizStats";
    pub const WORD_COUNTER_LOG: &str = "wordCounterLog";
    pub const WORD_COUNTER_TRIGGER_LOG: &str = "wordCounterTriggerLog";
}

const CHANGE_CAPACITY: usize = 64;

/// Notification sent to subscribers after a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// Changed key, `None` when the store was cleared
    pub key: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Volatile store, used for tests and when no storage path is writable
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            values: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.write().await.insert(key.to_string(), value);
        // No subscribers is fine
        let _ = self.changes.send(StoreChange {
            key: Some(key.to_string()),
        });
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.values.write().await.clear();
        let _ = self.changes.send(StoreChange { key: None });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_round_trip_and_clear() {
        let store = MemoryStore::new();
        let mut changes = store.subscribe();

        assert_eq!(store.get("missing").await.unwrap(), None);
        store.set("a", json!({"n": 1})).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!({"n": 1})));
        assert_eq!(changes.recv().await.unwrap().key.as_deref(), Some("a"));

        store.clear().await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(changes.recv().await.unwrap().key, None);
    }
}
