use parrot_config::ConfigChange;
use parrot_core::stats::HistoryFilter;
use parrot_types::{Answer, ClientMessage, PageMessage, ResultFilter, SampleSource};

use super::Session;
use super::sample::progress_message;
use crate::watch::stats_message;

impl Session {
    pub(super) async fn on_page_message(&mut self, message: PageMessage) -> anyhow::Result<()> {
        match message {
            PageMessage::Attached { url } => {
                tracing::info!(%url, "page attached");
                self.page_url = Some(url);
                self.sampler.clear();
                self.accumulator.reset_document();
                self.send_init().await?;
            }
            PageMessage::VisibleText { text } => {
                tracing::trace!(chars = text.len(), "visible text updated");
                self.sampler.update(text);
            }
            // Normally debounced before reaching the loop
            PageMessage::Scrolled => self.on_sample(SampleSource::Scroll).await?,
            PageMessage::Mutated => self.on_sample(SampleSource::Mutation).await?,
            PageMessage::QuizComplete { task_id, correct } => {
                if !self.presenter.resolve(task_id, Answer::from(correct)) {
                    tracing::debug!(%task_id, "answer for a task that is no longer presented");
                }
            }
            PageMessage::PopupClosed { task_id } => {
                if !self.presenter.close(task_id) {
                    tracing::debug!(%task_id, "popup closed for a task that is no longer presented");
                }
            }
            PageMessage::Navigated { url } => {
                tracing::info!(%url, "page navigated");
                self.leave_document().await?;
                self.page_url = Some(url);
                self.send_page(ClientMessage::RequestVisibleText).await?;
            }
            PageMessage::Detached => {
                tracing::info!("page detached");
                self.leave_document().await?;
                self.page_url = None;
            }
            PageMessage::ConfigUpdate { field, value } => {
                self.apply_config_update(&field, &value).await?;
            }
            PageMessage::RequestHistory { result, language } => {
                self.send_history(result, language).await?;
            }
            // The stats watcher pushes the emptied aggregate
            PageMessage::ClearStats => match self.state.stats.clear().await {
                Ok(()) => tracing::info!("quiz statistics cleared"),
                Err(e) => tracing::error!(error = %e, "failed to clear statistics"),
            },
        }

        Ok(())
    }

    async fn send_init(&self) -> anyhow::Result<()> {
        let (threshold, language) = {
            let config = self.state.config.read().await;
            (
                config.counter.word_threshold,
                config.quiz.selected_language.clone(),
            )
        };
        self.send_page(ClientMessage::InitWordCounter {
            threshold,
            language,
        })
        .await?;
        self.send_page(progress_message(self.accumulator.progress()))
            .await?;

        match self.state.stats.read_aggregate().await {
            Ok(stats) => self.send_page(stats_message(&stats)).await?,
            Err(e) => tracing::error!(error = %e, "failed to read statistics"),
        }

        self.send_page(ClientMessage::RequestVisibleText).await
    }

    async fn send_history(
        &self,
        result: ResultFilter,
        language: Option<String>,
    ) -> anyhow::Result<()> {
        let stats = match self.state.stats.read_aggregate().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "failed to read statistics");
                return Ok(());
            }
        };

        let filter = HistoryFilter { result, language };
        let results = stats.history(&filter).into_iter().cloned().collect();
        let languages = stats.languages().into_iter().map(str::to_string).collect();
        self.send_page(ClientMessage::History { results, languages })
            .await
    }

    /// The old document is gone: abort the task and forget its sample
    async fn leave_document(&mut self) -> anyhow::Result<()> {
        self.sampler.clear();
        self.abort_task().await?;
        self.accumulator.reset_document();
        Ok(())
    }

    async fn apply_config_update(&mut self, field: &str, value: &str) -> anyhow::Result<()> {
        let change = self.state.config.write().await.apply_update(field, value);

        match change {
            Ok(ConfigChange::WordThreshold(threshold)) => {
                if let Err(e) = self.accumulator.configure(threshold) {
                    tracing::warn!(error = %e, "threshold rejected by counter");
                }
                self.send_page(progress_message(self.accumulator.progress()))
                    .await?;
            }
            Ok(ConfigChange::AutoLaunch(enabled)) => {
                if enabled {
                    self.accumulator.resume();
                } else {
                    self.accumulator.pause();
                }
                tracing::info!(enabled, "auto launch updated");
            }
            Ok(ConfigChange::ManualTestMode(enabled)) => {
                tracing::info!(enabled, "manual test mode updated");
            }
            Ok(ConfigChange::SelectedLanguage(language)) => {
                tracing::info!(%language, "target language updated");
            }
            Err(e) => {
                tracing::warn!(field, value, error = %e, "rejected config update");
            }
        }

        Ok(())
    }
}
