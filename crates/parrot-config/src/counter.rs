use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_word_threshold() -> u64 {
    300
}

fn default_new_word_slack() -> u64 {
    5
}

fn default_scroll_debounce_ms() -> u64 {
    300
}

fn default_mutation_debounce_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_failure_reset_after() -> u32 {
    3
}

fn default_milestone_words() -> u64 {
    50
}

/// Word counting and sampling cadence
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CounterConfig {
    /// Newly seen words required to start a task
    #[serde(default = "default_word_threshold")]
    pub word_threshold: u64,
    /// Extra words allowed over the sample growth before clamping
    #[serde(default = "default_new_word_slack")]
    pub new_word_slack: u64,
    #[serde(default = "default_scroll_debounce_ms")]
    pub scroll_debounce_ms: u64,
    #[serde(default = "default_mutation_debounce_ms")]
    pub mutation_debounce_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Consecutive failed tasks after which pending progress is discarded
    #[serde(default = "default_failure_reset_after")]
    pub failure_reset_after: u32,
    #[serde(default = "default_milestone_words")]
    pub milestone_words: u64,
}

impl CounterConfig {
    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    pub fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.mutation_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            word_threshold: default_word_threshold(),
            new_word_slack: default_new_word_slack(),
            scroll_debounce_ms: default_scroll_debounce_ms(),
            mutation_debounce_ms: default_mutation_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            failure_reset_after: default_failure_reset_after(),
            milestone_words: default_milestone_words(),
        }
    }
}
