use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::wire::PageMessage;

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Message received from the attached page
    Page(PageMessage),
    /// A sampling stimulus passed its debounce window
    Sample(SampleSource),
    /// Progress report from a running task job
    Task(TaskEvent),
}

/// What caused a sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleSource {
    Scroll,
    Mutation,
    Poll,
    Resample,
}

impl fmt::Display for SampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleSource::Scroll => "scroll",
            SampleSource::Mutation => "mutation",
            SampleSource::Poll => "poll",
            SampleSource::Resample => "resample",
        };
        f.write_str(name)
    }
}

/// Results reported back to the event loop by spawned task jobs.
/// Every variant echoes the task id it belongs to.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Generated {
        task_id: TaskId,
        word: String,
        content: QuizContent,
    },
    GenerationFailed {
        task_id: TaskId,
        error: String,
    },
    BackoffElapsed {
        task_id: TaskId,
    },
    Answered {
        task_id: TaskId,
        answer: Answer,
    },
    PresentationTimedOut {
        task_id: TaskId,
    },
    PresentationLost {
        task_id: TaskId,
    },
}

impl TaskEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::Generated { task_id, .. }
            | TaskEvent::GenerationFailed { task_id, .. }
            | TaskEvent::BackoffElapsed { task_id }
            | TaskEvent::Answered { task_id, .. }
            | TaskEvent::PresentationTimedOut { task_id }
            | TaskEvent::PresentationLost { task_id } => *task_id,
        }
    }
}

/// Identifier passed through generation and presentation and echoed back on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizMode {
    /// Multiple-choice quiz
    Test,
    /// Reveal-based flashcard
    Practice,
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizMode::Test => f.write_str("Test"),
            QuizMode::Practice => f.write_str("Practice"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Correct,
    Incorrect,
}

impl Answer {
    pub fn is_correct(self) -> bool {
        matches!(self, Answer::Correct)
    }
}

impl From<bool> for Answer {
    fn from(correct: bool) -> Self {
        if correct {
            Answer::Correct
        } else {
            Answer::Incorrect
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestContent {
    pub option1: String,
    pub option2: String,
    pub option3: String,
    pub option4: String,
    pub correct: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option1_pronunciation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option2_pronunciation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option3_pronunciation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option4_pronunciation: Option<String>,
}

impl TestContent {
    pub fn options(&self) -> [&str; 4] {
        [&self.option1, &self.option2, &self.option3, &self.option4]
    }

    /// True when the correct answer is one of the four options
    pub fn is_consistent(&self) -> bool {
        let correct = self.correct.trim();
        self.options()
            .iter()
            .any(|option| option.trim().eq_ignore_ascii_case(correct))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeContent {
    pub original_word: String,
    pub translated_word: String,
    #[serde(default)]
    pub translated_word_pronunciation: String,
    pub original_word_def: String,
    pub example_original: String,
    #[serde(alias = "exampleTraslated")]
    pub example_translated: String,
    #[serde(default)]
    pub example_translated_pronunciation: String,
}

/// Generated material for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "data")]
pub enum QuizContent {
    Test(TestContent),
    Practice(PracticeContent),
}

impl QuizContent {
    pub fn mode(&self) -> QuizMode {
        match self {
            QuizContent::Test(_) => QuizMode::Test,
            QuizContent::Practice(_) => QuizMode::Practice,
        }
    }

    pub fn translated_word(&self) -> Option<&str> {
        match self {
            QuizContent::Test(test) => Some(test.correct.as_str()),
            QuizContent::Practice(practice) => Some(practice.translated_word.as_str()),
        }
    }
}

/// One completed task. Appended to history, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub word: String,
    #[serde(alias = "language")]
    pub target_language: String,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_word: Option<String>,
    /// ISO-8601
    pub timestamp: String,
}

/// Which outcomes a history view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFilter {
    #[default]
    All,
    Correct,
    Incorrect,
}

/// Handed to the popup presenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentRequest {
    pub task_id: TaskId,
    pub word: String,
    pub content: QuizContent,
}
