use serde::{Deserialize, Serialize};

pub const SUPPORTED_LANGUAGES: [&str; 6] =
    ["English", "Spanish", "French", "German", "Italian", "Latvian"];

pub fn is_supported_language(language: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&language)
}

fn default_selected_language() -> String {
    "Spanish".to_string()
}

fn default_auto_launch_enabled() -> bool {
    true
}

fn default_min_attempts() -> u32 {
    5
}

fn default_test_accuracy() -> f64 {
    0.7
}

fn default_recent_window() -> usize {
    20
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct QuizConfig {
    #[serde(default = "default_selected_language")]
    pub selected_language: String,
    /// Start counting and launching tasks automatically
    #[serde(default = "default_auto_launch_enabled")]
    pub auto_launch_enabled: bool,
    /// Always present Test mode
    #[serde(default)]
    pub manual_test_mode: bool,
    /// Attempts required before Test mode is considered
    #[serde(default = "default_min_attempts")]
    pub min_attempts: u32,
    /// Accuracy (0..=1) at or above which Test mode is chosen
    #[serde(default = "default_test_accuracy")]
    pub test_accuracy: f64,
    /// Number of most recent results the accuracy is computed over, 0 for all
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            selected_language: default_selected_language(),
            auto_launch_enabled: default_auto_launch_enabled(),
            manual_test_mode: false,
            min_attempts: default_min_attempts(),
            test_accuracy: default_test_accuracy(),
            recent_window: default_recent_window(),
        }
    }
}
