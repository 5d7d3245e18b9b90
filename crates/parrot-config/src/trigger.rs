use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_presentation_timeout_secs() -> u64 {
    120
}

fn default_error_backoff_ms() -> u64 {
    5000
}

fn default_max_generation_errors() -> u32 {
    2
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TriggerConfig {
    /// How long a popup may stay unanswered before the task is abandoned
    #[serde(default = "default_presentation_timeout_secs")]
    pub presentation_timeout_secs: u64,
    /// Delay before returning to idle after a failed generation
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Generation errors tolerated before the pending progress is consumed
    #[serde(default = "default_max_generation_errors")]
    pub max_generation_errors: u32,
}

impl TriggerConfig {
    pub fn presentation_timeout(&self) -> Duration {
        Duration::from_secs(self.presentation_timeout_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            presentation_timeout_secs: default_presentation_timeout_secs(),
            error_backoff_ms: default_error_backoff_ms(),
            max_generation_errors: default_max_generation_errors(),
        }
    }
}
