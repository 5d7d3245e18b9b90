use std::sync::Arc;

use parrot_types::QuizOutcome;
pub use parrot_types::ResultFilter;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};

use crate::error::StoreError;
use crate::store::{Store, StoreChange, keys};

/// Aggregate quiz history.
///
/// `total_attempts == correct_answers + incorrect_answers == results.len()`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub total_attempts: u64,
    pub correct_answers: u64,
    pub incorrect_answers: u64,
    /// Insertion order
    pub results: Vec<QuizOutcome>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub result: ResultFilter,
    pub language: Option<String>,
}

impl QuizStats {
    pub fn record(&mut self, outcome: QuizOutcome) {
        self.total_attempts += 1;
        if outcome.correct {
            self.correct_answers += 1;
        } else {
            self.incorrect_answers += 1;
        }
        self.results.push(outcome);
    }

    /// Correct minus incorrect
    pub fn score(&self) -> i64 {
        self.correct_answers as i64 - self.incorrect_answers as i64
    }

    /// Overall accuracy in 0..=1, `None` without attempts
    pub fn accuracy(&self) -> Option<f64> {
        (self.total_attempts > 0).then(|| self.correct_answers as f64 / self.total_attempts as f64)
    }

    /// Accuracy over the last `window` results, or all of them when `window` is 0
    pub fn recent_accuracy(&self, window: usize) -> Option<f64> {
        if window == 0 {
            return self.accuracy();
        }
        let start = self.results.len().saturating_sub(window);
        let recent = &self.results[start..];
        if recent.is_empty() {
            return None;
        }
        let correct = recent.iter().filter(|r| r.correct).count();
        Some(correct as f64 / recent.len() as f64)
    }

    /// Matching results, most recent first
    pub fn history(&self, filter: &HistoryFilter) -> Vec<&QuizOutcome> {
        let mut matching: Vec<&QuizOutcome> = self
            .results
            .iter()
            .rev()
            .filter(|r| match filter.result {
                ResultFilter::All => true,
                ResultFilter::Correct => r.correct,
                ResultFilter::Incorrect => !r.correct,
            })
            .filter(|r| {
                filter
                    .language
                    .as_deref()
                    .is_none_or(|language| r.target_language == language)
            })
            .collect();

        // RFC 3339 timestamps with the same offset order lexicographically.
        // Stable, so ties keep the later insertion first.
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching
    }

    /// Target languages in order of first appearance
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = Vec::new();
        for result in &self.results {
            if !languages.contains(&result.target_language.as_str()) {
                languages.push(&result.target_language);
            }
        }
        languages
    }

    pub fn is_consistent(&self) -> bool {
        self.total_attempts == self.correct_answers + self.incorrect_answers
            && self.total_attempts == self.results.len() as u64
    }
}

/// Appends outcomes to the persistent store and serves aggregates
pub struct StatsRecorder {
    store: Arc<dyn Store>,
    // Serializes get-then-set on the aggregate
    write_lock: Mutex<()>,
}

impl StatsRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub async fn record(&self, outcome: QuizOutcome) -> Result<QuizStats, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut stats = self.read_aggregate().await?;
        stats.record(outcome);
        self.store
            .set(keys::QUIZ_STATS, serde_json::to_value(&stats)?)
            .await?;

        tracing::debug!(
            total = stats.total_attempts,
            correct = stats.correct_answers,
            "quiz result saved"
        );
        Ok(stats)
    }

    pub async fn read_aggregate(&self) -> Result<QuizStats, StoreError> {
        match self.store.get(keys::QUIZ_STATS).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(QuizStats::default()),
        }
    }

    /// Drop the whole history
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store
            .set(keys::QUIZ_STATS, serde_json::to_value(QuizStats::default())?)
            .await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.store.subscribe()
    }
}
