use std::time::Duration;

use chrono::Utc;
use parrot_core::accumulator::{CounterSnapshot, Progress, SampleOutcome, TriggerEvent};
use parrot_core::error::SampleError;
use parrot_core::sample::VisibilitySampler;
use parrot_core::store::keys;
use parrot_types::{ClientMessage, SampleSource};
use serde::Serialize;
use tokio::time::Instant;

use super::Session;

const PROGRESS_LINE_WORDS: u64 = 5;
const PROGRESS_LINE_INTERVAL: Duration = Duration::from_secs(5);
const SIGNIFICANT_VISIBLE_CHANGE: u64 = 10;

/// Rate limits progress lines and counter log writes
pub struct ProgressLog {
    started: Instant,
    last_line: Option<Instant>,
    last_logged_visible: u64,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            last_line: None,
            last_logged_visible: 0,
        }
    }

    /// A line is due after a burst of new words or a quiet spell
    fn line_due(&mut self, new_words: u64) -> bool {
        let now = Instant::now();
        let due = new_words >= PROGRESS_LINE_WORDS
            || self
                .last_line
                .is_none_or(|last| now.duration_since(last) > PROGRESS_LINE_INTERVAL);
        if due {
            self.last_line = Some(now);
        }
        due
    }

    /// Visible count moved by 10 words or 10 percent since the last write
    fn snapshot_due(&mut self, visible: u64) -> bool {
        let diff = visible.abs_diff(self.last_logged_visible);
        let significant = diff >= SIGNIFICANT_VISIBLE_CHANGE
            || diff * 10 >= self.last_logged_visible.max(1);
        if significant {
            self.last_logged_visible = visible;
        }
        significant
    }

    fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CounterLogEntry {
    #[serde(flatten)]
    snapshot: CounterSnapshot,
    time_elapsed: u64,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerLogEntry<'a> {
    trigger_number: u64,
    cumulative_count: u64,
    threshold: u64,
    time_elapsed: u64,
    timestamp: String,
    url: Option<&'a str>,
}

pub fn progress_message(progress: Progress) -> ClientMessage {
    ClientMessage::Progress {
        current: progress.current,
        threshold: progress.threshold,
        percentage: progress.percentage,
    }
}

impl Session {
    pub(super) async fn on_sample(&mut self, source: SampleSource) -> anyhow::Result<()> {
        if !self.accumulator.accepts_samples() {
            tracing::trace!(%source, "counter paused, skipping sample");
            return Ok(());
        }

        let sample = match self.sampler.sample() {
            Ok(sample) => sample,
            Err(SampleError::NoDocument) => {
                tracing::trace!(%source, "no document attached");
                return Ok(());
            }
        };
        let visible = sample.len() as u64;

        match self.accumulator.on_sample(sample) {
            SampleOutcome::Ignored(reason) => {
                tracing::debug!(%source, ?reason, "sample ignored");
            }
            SampleOutcome::Counted {
                new_words,
                progress,
                milestone,
            } => {
                tracing::debug!(%source, visible, new_words, "sample counted");

                if new_words > 0 && self.progress_log.line_due(new_words) {
                    tracing::info!(
                        new_words,
                        current = progress.current,
                        threshold = progress.threshold,
                        percentage = progress.percentage,
                        "new words counted"
                    );
                }
                if let Some(milestone) = milestone {
                    tracing::info!(
                        milestone,
                        percentage = milestone * 100 / progress.threshold,
                        "word milestone reached"
                    );
                }
                if self.progress_log.snapshot_due(visible) {
                    self.persist_counter_log().await;
                }

                self.send_page(progress_message(progress)).await?;
            }
            SampleOutcome::Triggered(event) => {
                self.persist_counter_log().await;
                self.persist_trigger_log(&event).await;
                self.send_page(progress_message(self.accumulator.progress()))
                    .await?;

                let language = self.state.config.read().await.quiz.selected_language.clone();
                if let Some(action) = self.trigger.start(&event, &language, self.page_url.clone()) {
                    self.run_action(action).await?;
                }
            }
        }

        Ok(())
    }

    async fn persist_counter_log(&self) {
        let entry = CounterLogEntry {
            snapshot: self.accumulator.snapshot(),
            time_elapsed: self.progress_log.elapsed_secs(),
            timestamp: Utc::now().to_rfc3339(),
        };
        self.persist(keys::WORD_COUNTER_LOG, &entry).await;
    }

    async fn persist_trigger_log(&self, event: &TriggerEvent) {
        tracing::info!(
            trigger = event.sequence,
            cumulative = event.cumulative_count,
            visible = event.visible_count,
            "triggering quiz"
        );
        let entry = TriggerLogEntry {
            trigger_number: event.sequence,
            cumulative_count: event.cumulative_count,
            threshold: event.threshold,
            time_elapsed: self.progress_log.elapsed_secs(),
            timestamp: Utc::now().to_rfc3339(),
            url: self.page_url.as_deref(),
        };
        self.persist(keys::WORD_COUNTER_TRIGGER_LOG, &entry).await;
    }

    async fn persist(&self, key: &str, value: &impl Serialize) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to encode log entry");
                return;
            }
        };
        if let Err(e) = self.state.stats.store().set(key, value).await {
            tracing::error!(key, error = %e, "failed to persist log entry");
        }
    }
}
