use unicode_normalization::UnicodeNormalization;

use crate::sample::Sample;

pub trait Preprocessor {
    /// NFKC normalization with line breaks folded into spaces
    fn process(&self, text: &str) -> String {
        let text = text.trim();

        if text.is_empty() {
            return String::new();
        }

        let text: String = text.nfkc().collect();

        text.replace(['\n', '\r', '\t'], " ").trim().to_string()
    }

    /// Split visible text into a bag of words
    fn tokenize(&self, text: &str) -> Sample {
        Sample::new(self.process(text).split_whitespace().map(str::to_string))
    }

    /// Words handed to word selection: alphabetic tokens of at least three
    /// letters, capped at `max_words`
    fn selection_context(&self, text: &str, max_words: usize) -> String {
        self.process(text)
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphabetic()))
            .filter(|word| word.chars().count() >= 3 && word.chars().all(char::is_alphabetic))
            .take(max_words)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPreprocessor;
impl Preprocessor for DefaultPreprocessor {}
