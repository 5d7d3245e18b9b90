use parrot_types::{PracticeContent, QuizContent, QuizMode, TestContent};

use crate::GenerateError;

/// Strip markdown code fences and surrounding prose around a JSON object
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Parse model output into content for `mode`. No partial results: anything
/// that does not fully parse is an error.
pub fn parse_content(raw: &str, mode: QuizMode) -> Result<QuizContent, GenerateError> {
    let json = extract_json(raw)
        .ok_or_else(|| GenerateError::MalformedContent("no JSON object in response".into()))?;

    match mode {
        QuizMode::Test => {
            let test: TestContent = serde_json::from_str(json)
                .map_err(|e| GenerateError::MalformedContent(e.to_string()))?;
            if !test.is_consistent() {
                return Err(GenerateError::MalformedContent(format!(
                    "correct answer '{}' is not among the options",
                    test.correct
                )));
            }
            Ok(QuizContent::Test(test))
        }
        QuizMode::Practice => {
            let practice: PracticeContent = serde_json::from_str(json)
                .map_err(|e| GenerateError::MalformedContent(e.to_string()))?;
            if practice.translated_word.trim().is_empty() {
                return Err(GenerateError::MalformedContent(
                    "empty translated word".into(),
                ));
            }
            Ok(QuizContent::Practice(practice))
        }
    }
}

/// First word of the model's answer, without quotes or punctuation
pub fn parse_word(raw: &str) -> Result<String, GenerateError> {
    raw.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .find(|w| !w.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GenerateError::MalformedContent("empty word selection".into()))
}
