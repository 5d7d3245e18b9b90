use parrot_config::quiz::QuizConfig;
use parrot_types::QuizMode;

use crate::stats::QuizStats;

/// Stepwise Test/Practice policy.
///
/// Fewer than `min_attempts` recorded attempts always give Practice. After
/// that, accuracy over the most recent `recent_window` results (all results
/// when zero) at or above `test_accuracy` gives Test, anything lower gives
/// Practice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModePolicy {
    pub min_attempts: u32,
    pub test_accuracy: f64,
    pub recent_window: usize,
}

impl Default for ModePolicy {
    fn default() -> Self {
        Self {
            min_attempts: 5,
            test_accuracy: 0.7,
            recent_window: 20,
        }
    }
}

impl From<&QuizConfig> for ModePolicy {
    fn from(config: &QuizConfig) -> Self {
        Self {
            min_attempts: config.min_attempts,
            test_accuracy: config.test_accuracy,
            recent_window: config.recent_window,
        }
    }
}

/// Pick the presentation mode. `manual_override` wins over the computed mode.
pub fn determine_mode(
    stats: &QuizStats,
    policy: &ModePolicy,
    manual_override: Option<QuizMode>,
) -> QuizMode {
    if let Some(mode) = manual_override {
        return mode;
    }

    if stats.total_attempts < u64::from(policy.min_attempts) {
        return QuizMode::Practice;
    }

    match stats.recent_accuracy(policy.recent_window) {
        Some(accuracy) if accuracy >= policy.test_accuracy => QuizMode::Test,
        _ => QuizMode::Practice,
    }
}
