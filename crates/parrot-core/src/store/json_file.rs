use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};

use super::{CHANGE_CAPACITY, Store, StoreChange};
use crate::error::StoreError;

/// Store persisted as one JSON object on disk.
///
/// Every mutation rewrites the file through a temporary file and a rename.
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let values = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %path.display(), keys = values.len(), "store opened");

        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            path,
            values: RwLock::new(values),
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, values: &Map<String, Value>) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(values)?;

        tokio::fs::write(&tmp_path, json.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        let previous = values.insert(key.to_string(), value);

        if let Err(e) = self.persist(&values).await {
            // Keep memory in line with what is on disk
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(e);
        }
        drop(values);

        let _ = self.changes.send(StoreChange {
            key: Some(key.to_string()),
        });
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        self.persist(&Map::new()).await?;
        values.clear();
        drop(values);

        let _ = self.changes.send(StoreChange { key: None });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
