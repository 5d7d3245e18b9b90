use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parrot")
        .join("storage.json")
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the key-value store
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl StorageConfig {
    pub fn new() -> Self {
        let path = env::var("PARROT_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_path());

        Self { path }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}
