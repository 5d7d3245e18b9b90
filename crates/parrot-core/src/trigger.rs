//! Lifecycle of the single in-flight learning task.
//!
//! The state machine does no I/O. Each transition returns the action the
//! caller has to carry out (spawn generation, present, sleep) and the caller
//! reports results back with the task id it was given. Results carrying any
//! other id are stale and ignored.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parrot_types::{Answer, PresentRequest, QuizContent, QuizOutcome, TaskId};

use crate::accumulator::TriggerEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub sequence: u64,
    pub started_at: DateTime<Utc>,
    pub target_language: String,
    /// Page the task was triggered on
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerPhase {
    Idle,
    Requesting(TaskRecord),
    Presenting {
        task: TaskRecord,
        word: String,
        translated_word: Option<String>,
    },
    CoolingDown(TaskRecord),
}

impl TriggerPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TriggerPhase::Idle => "idle",
            TriggerPhase::Requesting(_) => "requesting",
            TriggerPhase::Presenting { .. } => "presenting",
            TriggerPhase::CoolingDown(_) => "cooling_down",
        }
    }

    fn task(&self) -> Option<&TaskRecord> {
        match self {
            TriggerPhase::Idle => None,
            TriggerPhase::Requesting(task) | TriggerPhase::CoolingDown(task) => Some(task),
            TriggerPhase::Presenting { task, .. } => Some(task),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerAction {
    /// Select a word and generate content for it
    Generate(TaskRecord),
    /// Show the content and wait at most `timeout` for an answer
    Present {
        request: PresentRequest,
        timeout: Duration,
    },
    /// Wait `delay` then report `BackoffElapsed`
    Backoff { task_id: TaskId, delay: Duration },
}

/// Delivered once per task when it leaves the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCompletion {
    pub task_id: TaskId,
    pub sequence: u64,
    pub success: bool,
    /// Accumulated progress should be treated as consumed
    pub consume_progress: bool,
    pub outcome: Option<QuizOutcome>,
    pub elapsed: Duration,
    pub reason: CompletionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    Answered,
    GenerationFailed,
    TimedOut,
    PopupLost,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct TaskTrigger {
    phase: TriggerPhase,
    error_count: u32,
    max_errors: u32,
    presentation_timeout: Duration,
    error_backoff: Duration,
}

impl TaskTrigger {
    pub fn new(max_errors: u32, presentation_timeout: Duration, error_backoff: Duration) -> Self {
        Self {
            phase: TriggerPhase::Idle,
            error_count: 0,
            max_errors,
            presentation_timeout,
            error_backoff,
        }
    }

    pub fn from_config(config: &parrot_config::trigger::TriggerConfig) -> Self {
        Self::new(
            config.max_generation_errors,
            config.presentation_timeout(),
            config.error_backoff(),
        )
    }

    pub fn phase(&self) -> &TriggerPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, TriggerPhase::Idle)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn current_task(&self) -> Option<TaskId> {
        self.phase.task().map(|task| task.id)
    }

    /// Start a task for `event`. Refused unless idle.
    pub fn start(
        &mut self,
        event: &TriggerEvent,
        target_language: &str,
        page: Option<String>,
    ) -> Option<TriggerAction> {
        if !self.is_idle() {
            tracing::warn!(
                phase = self.phase.name(),
                sequence = event.sequence,
                "trigger received while a task is in flight, ignoring"
            );
            return None;
        }

        let task = TaskRecord {
            id: TaskId::new(),
            sequence: event.sequence,
            started_at: Utc::now(),
            target_language: target_language.to_string(),
            page,
        };
        tracing::info!(task_id = %task.id, sequence = task.sequence, "requesting content");

        self.phase = TriggerPhase::Requesting(task.clone());
        Some(TriggerAction::Generate(task))
    }

    pub fn on_generated(
        &mut self,
        task_id: TaskId,
        word: String,
        content: QuizContent,
    ) -> Option<TriggerAction> {
        let TriggerPhase::Requesting(task) = &self.phase else {
            return self.stale(task_id);
        };
        if task.id != task_id {
            return self.stale(task_id);
        }

        let task = task.clone();
        tracing::info!(task_id = %task_id, word = %word, mode = %content.mode(), "presenting");

        self.phase = TriggerPhase::Presenting {
            task,
            word: word.clone(),
            translated_word: content.translated_word().map(str::to_string),
        };

        Some(TriggerAction::Present {
            request: PresentRequest {
                task_id,
                word,
                content,
            },
            timeout: self.presentation_timeout,
        })
    }

    pub fn on_generation_failed(&mut self, task_id: TaskId, error: &str) -> Option<TriggerAction> {
        let TriggerPhase::Requesting(task) = &self.phase else {
            return self.stale(task_id);
        };
        if task.id != task_id {
            return self.stale(task_id);
        }
        let task = task.clone();

        self.error_count += 1;
        tracing::warn!(
            task_id = %task_id,
            errors = self.error_count,
            "content generation failed: {error}"
        );

        self.phase = TriggerPhase::CoolingDown(task);
        Some(TriggerAction::Backoff {
            task_id,
            delay: self.error_backoff,
        })
    }

    pub fn on_backoff_elapsed(&mut self, task_id: TaskId) -> Option<TaskCompletion> {
        let TriggerPhase::CoolingDown(task) = &self.phase else {
            return self.stale(task_id);
        };
        if task.id != task_id {
            return self.stale(task_id);
        }
        let task = task.clone();

        let consume_progress = self.error_count > self.max_errors;
        if consume_progress {
            tracing::warn!(
                errors = self.error_count,
                "generation keeps failing, consuming pending progress"
            );
        }

        Some(self.finish(
            task,
            false,
            consume_progress,
            None,
            CompletionReason::GenerationFailed,
        ))
    }

    pub fn on_answered(&mut self, task_id: TaskId, answer: Answer) -> Option<TaskCompletion> {
        let TriggerPhase::Presenting {
            task,
            word,
            translated_word,
        } = &self.phase
        else {
            return self.stale(task_id);
        };
        if task.id != task_id {
            return self.stale(task_id);
        }

        let task = task.clone();
        let outcome = QuizOutcome {
            word: word.clone(),
            target_language: task.target_language.clone(),
            correct: answer.is_correct(),
            translated_word: translated_word.clone(),
            timestamp: Utc::now().to_rfc3339(),
        };
        self.error_count = 0;

        Some(self.finish(task, true, false, Some(outcome), CompletionReason::Answered))
    }

    /// The presenter did not resolve within the timeout window
    pub fn on_presentation_timeout(&mut self, task_id: TaskId) -> Option<TaskCompletion> {
        self.end_presentation(task_id, CompletionReason::TimedOut)
    }

    /// The popup went away without an answer
    pub fn on_presentation_lost(&mut self, task_id: TaskId) -> Option<TaskCompletion> {
        self.end_presentation(task_id, CompletionReason::PopupLost)
    }

    /// Drop whatever task is in flight, e.g. on navigation or page close
    pub fn abort(&mut self) -> Option<TaskCompletion> {
        let task = self.phase.task()?.clone();
        tracing::info!(phase = self.phase.name(), "aborting in-flight task");
        Some(self.finish(task, false, false, None, CompletionReason::Aborted))
    }

    fn end_presentation(
        &mut self,
        task_id: TaskId,
        reason: CompletionReason,
    ) -> Option<TaskCompletion> {
        let TriggerPhase::Presenting { task, .. } = &self.phase else {
            return self.stale(task_id);
        };
        if task.id != task_id {
            return self.stale(task_id);
        }

        tracing::warn!(task_id = %task_id, ?reason, "presentation ended without answer");
        let task = task.clone();
        Some(self.finish(task, false, false, None, reason))
    }

    fn finish(
        &mut self,
        task: TaskRecord,
        success: bool,
        consume_progress: bool,
        outcome: Option<QuizOutcome>,
        reason: CompletionReason,
    ) -> TaskCompletion {
        self.phase = TriggerPhase::Idle;

        let elapsed = (Utc::now() - task.started_at).to_std().unwrap_or_default();
        tracing::info!(
            task_id = %task.id,
            success,
            ?reason,
            elapsed_ms = elapsed.as_millis() as u64,
            "task finished"
        );

        TaskCompletion {
            task_id: task.id,
            sequence: task.sequence,
            success,
            consume_progress,
            outcome,
            elapsed,
            reason,
        }
    }

    fn stale<T>(&self, task_id: TaskId) -> Option<T> {
        tracing::debug!(
            task_id = %task_id,
            phase = self.phase.name(),
            "ignoring result for a task that is not current"
        );
        None
    }
}
