use async_trait::async_trait;
use parrot_config::generator::GeneratorConfig;
use parrot_types::{QuizContent, QuizMode};
use serde_json::json;

use crate::parse::{parse_content, parse_word};
use crate::{ContentGenerator, GenerateError, ProviderMetadata, prompt};

/// Chat-completions backed generator
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn complete(&self, prompt: String) -> Result<String, GenerateError> {
        if self.api_key.is_empty() {
            return Err(GenerateError::AuthenticationError);
        }

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt::SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status() == 429 {
            return Err(GenerateError::RateLimitExceeded);
        }

        if response.status() == 401 || response.status() == 403 {
            return Err(GenerateError::AuthenticationError);
        }

        if !response.status().is_success() {
            return Err(GenerateError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            GenerateError::ApiError(format!("Failed to parse response: {}", e))
        })?;

        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| GenerateError::ApiError("No completion in response".to_string()))?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn select_word(&self, context: &str) -> Result<String, GenerateError> {
        if context.trim().is_empty() {
            return Err(GenerateError::EmptyContext);
        }

        let raw = self.complete(prompt::select_word(context)).await?;
        let word = parse_word(&raw)?;
        tracing::debug!(word = %word, "word selected");
        Ok(word)
    }

    async fn generate(
        &self,
        word: &str,
        target_language: &str,
        mode: QuizMode,
    ) -> Result<QuizContent, GenerateError> {
        let prompt = match mode {
            QuizMode::Test => prompt::test(word, target_language),
            QuizMode::Practice => prompt::practice(word, target_language),
        };

        let raw = self.complete(prompt).await?;
        parse_content(&raw, mode)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "OpenAI".to_string(),
            model: self.model.clone(),
            requires_api_key: true,
        }
    }
}
