use std::path::Path;
use std::sync::Arc;

use parrot_config::Config;
use parrot_core::stats::StatsRecorder;
use parrot_core::store::{JsonFileStore, MemoryStore, Store};
use parrot_generator::{ContentGenerator, OpenAiGenerator};
use tokio::sync::RwLock;

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub stats: StatsRecorder,
    pub generator: Arc<dyn ContentGenerator>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = open_store(&config.storage.path).await;
        let generator = OpenAiGenerator::new(&config.generator)?;

        let metadata = generator.metadata();
        tracing::info!(provider = %metadata.name, model = %metadata.model, "content generator ready");
        if metadata.requires_api_key && config.generator.api_key.is_empty() {
            tracing::warn!(
                provider = %metadata.name,
                "no API key configured, every quiz generation will fail"
            );
        }

        Ok(Self::with_parts(config, store, Arc::new(generator)))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn Store>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            stats: StatsRecorder::new(store),
            generator,
        }
    }
}

async fn open_store(path: &Path) -> Arc<dyn Store> {
    match JsonFileStore::open(path).await {
        Ok(store) => {
            tracing::info!(path = %store.path().display(), "statistics store opened");
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "failed to open statistics store, results will not survive a restart"
            );
            Arc::new(MemoryStore::new())
        }
    }
}
