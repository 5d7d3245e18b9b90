//! Messages exchanged with the browser extension over the page socket.

use serde::{Deserialize, Serialize};

use crate::types::{QuizContent, QuizMode, QuizOutcome, ResultFilter, TaskId};

/// Page -> service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    Attached {
        url: String,
    },
    /// Text of the currently visible document region
    VisibleText {
        text: String,
    },
    Scrolled,
    Mutated,
    #[serde(rename_all = "camelCase")]
    QuizComplete {
        task_id: TaskId,
        correct: bool,
    },
    #[serde(rename_all = "camelCase")]
    PopupClosed {
        task_id: TaskId,
    },
    Navigated {
        url: String,
    },
    Detached,
    ConfigUpdate {
        field: String,
        value: String,
    },
    /// Word history, most recent first
    RequestHistory {
        #[serde(default)]
        result: ResultFilter,
        #[serde(default)]
        language: Option<String>,
    },
    ClearStats,
}

/// Service -> page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    InitWordCounter {
        threshold: u64,
        language: String,
    },
    RequestVisibleText,
    #[serde(rename_all = "camelCase")]
    InitQuiz {
        task_id: TaskId,
        word: String,
        mode: QuizMode,
        content: QuizContent,
    },
    Progress {
        current: u64,
        threshold: u64,
        percentage: u64,
    },
    #[serde(rename_all = "camelCase")]
    Stats {
        total_attempts: u64,
        correct_answers: u64,
        incorrect_answers: u64,
        score: i64,
        accuracy: f64,
    },
    History {
        results: Vec<QuizOutcome>,
        /// Every language seen, regardless of the filter
        languages: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_messages_use_type_tag() {
        let msg: PageMessage = serde_json::from_str(r#"{"type":"SCROLLED"}"#).unwrap();
        assert_eq!(msg, PageMessage::Scrolled);

        let msg: PageMessage =
            serde_json::from_str(r#"{"type":"VISIBLE_TEXT","text":"hello world"}"#).unwrap();
        assert_eq!(
            msg,
            PageMessage::VisibleText {
                text: "hello world".into()
            }
        );
    }

    #[test]
    fn quiz_complete_uses_camel_case_task_id() {
        let task_id = TaskId::new();
        let json = format!(r#"{{"type":"QUIZ_COMPLETE","taskId":"{task_id}","correct":false}}"#);
        let msg: PageMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(
            msg,
            PageMessage::QuizComplete {
                task_id,
                correct: false
            }
        );
    }

    #[test]
    fn history_request_defaults_to_everything() {
        let msg: PageMessage = serde_json::from_str(r#"{"type":"REQUEST_HISTORY"}"#).unwrap();
        assert_eq!(
            msg,
            PageMessage::RequestHistory {
                result: ResultFilter::All,
                language: None
            }
        );

        let msg: PageMessage = serde_json::from_str(
            r#"{"type":"REQUEST_HISTORY","result":"incorrect","language":"French"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            PageMessage::RequestHistory {
                result: ResultFilter::Incorrect,
                language: Some("French".into())
            }
        );
    }

    #[test]
    fn client_message_serializes_tag() {
        let json = serde_json::to_value(ClientMessage::RequestVisibleText).unwrap();
        assert_eq!(json["type"], "REQUEST_VISIBLE_TEXT");
    }
}
