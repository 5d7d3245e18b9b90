use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    500
}

fn default_max_context_words() -> usize {
    200
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Visible words handed to word selection
    #[serde(default = "default_max_context_words")]
    pub max_context_words: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self {
            api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            api_url: env::var("OPENAI_API_URL").unwrap_or_else(|_| default_api_url()),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_context_words: default_max_context_words(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
