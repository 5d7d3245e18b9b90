use std::env;

use serde::{Deserialize, Serialize};

use self::counter::CounterConfig;
use self::generator::GeneratorConfig;
use self::network::NetworkConfig;
use self::quiz::{QuizConfig, is_supported_language};
use self::storage::StorageConfig;
use self::trigger::TriggerConfig;

pub mod counter;
pub mod generator;
pub mod network;
pub mod quiz;
pub mod storage;
pub mod trigger;

#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub counter: CounterConfig,
    pub trigger: TriggerConfig,
    pub quiz: QuizConfig,
    pub generator: GeneratorConfig,
    pub storage: StorageConfig,
}

/// Setting changed at runtime through `apply_update`
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    WordThreshold(u64),
    AutoLaunch(bool),
    ManualTestMode(bool),
    SelectedLanguage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Word threshold must be positive")]
    ZeroThreshold,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Test accuracy must be within 0..=1, got {0}")]
    AccuracyOutOfRange(f64),

    #[error("Unknown setting: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl Config {
    pub fn new() -> Self {
        let mut counter = CounterConfig::default();
        if let Some(threshold) = env::var("PARROT_WORD_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            counter.word_threshold = threshold;
        }

        let mut quiz = QuizConfig::default();
        if let Ok(language) = env::var("PARROT_LANGUAGE") {
            quiz.selected_language = language;
        }

        Config {
            network: NetworkConfig::new(),
            counter,
            trigger: TriggerConfig::default(),
            quiz,
            generator: GeneratorConfig::new(),
            storage: StorageConfig::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counter.word_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if !is_supported_language(&self.quiz.selected_language) {
            return Err(ConfigError::UnsupportedLanguage(
                self.quiz.selected_language.clone(),
            ));
        }
        if self.counter.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("poll_interval_ms"));
        }
        if self.network.handshake_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("handshake_timeout_ms"));
        }
        if self.trigger.presentation_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("presentation_timeout_secs"));
        }
        if !(0.0..=1.0).contains(&self.quiz.test_accuracy) {
            return Err(ConfigError::AccuracyOutOfRange(self.quiz.test_accuracy));
        }
        Ok(())
    }

    /// Apply a setting sent by the extension popup. Field names follow the
    /// extension's storage keys.
    pub fn apply_update(&mut self, field: &str, value: &str) -> Result<ConfigChange, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };

        match field {
            "wordThreshold" => {
                let threshold: u64 = value.trim().parse().map_err(|_| invalid())?;
                if threshold == 0 {
                    return Err(ConfigError::ZeroThreshold);
                }
                self.counter.word_threshold = threshold;
                Ok(ConfigChange::WordThreshold(threshold))
            }
            "autoLaunchEnabled" => {
                let enabled: bool = value.trim().parse().map_err(|_| invalid())?;
                self.quiz.auto_launch_enabled = enabled;
                Ok(ConfigChange::AutoLaunch(enabled))
            }
            "manualTestMode" => {
                let enabled: bool = value.trim().parse().map_err(|_| invalid())?;
                self.quiz.manual_test_mode = enabled;
                Ok(ConfigChange::ManualTestMode(enabled))
            }
            "selectedLanguage" => {
                let language = value.trim();
                if !is_supported_language(language) {
                    return Err(ConfigError::UnsupportedLanguage(language.to_string()));
                }
                self.quiz.selected_language = language.to_string();
                Ok(ConfigChange::SelectedLanguage(language.to_string()))
            }
            other => Err(ConfigError::UnknownField(other.to_string())),
        }
    }
}
