use parrot_types::{QuizContent, QuizMode};

mod openai;
mod parse;
mod prompt;

pub use openai::OpenAiGenerator;
pub use parse::{parse_content, parse_word};

/// Produces the word and quiz material for one task
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Pick a word worth learning from visible page text
    async fn select_word(&self, context: &str) -> Result<String, GenerateError>;

    /// Build Test options or a Practice flashcard for `word`
    async fn generate(
        &self,
        word: &str,
        target_language: &str,
        mode: QuizMode,
    ) -> Result<QuizContent, GenerateError>;

    /// Provider metadata
    fn metadata(&self) -> ProviderMetadata;
}

#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub name: String,
    pub model: String,
    pub requires_api_key: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Malformed content: {0}")]
    MalformedContent(String),

    #[error("No text to select a word from")]
    EmptyContext,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication error")]
    AuthenticationError,
}
