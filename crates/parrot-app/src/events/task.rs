use std::sync::Arc;
use std::time::Duration;

use parrot_core::mode::{ModePolicy, determine_mode};
use parrot_core::stats::QuizStats;
use parrot_core::trigger::{CompletionReason, TaskCompletion, TaskRecord, TriggerAction};
use parrot_types::{
    AppEvent, ClientMessage, PresentRequest, QuizContent, QuizMode, SampleSource, TaskEvent,
    TaskId,
};
use tokio_util::sync::CancellationToken;

use super::Session;
use super::sample::progress_message;
use crate::presenter::Presentation;
use crate::state::AppState;

impl Session {
    pub(super) async fn on_task_event(&mut self, event: TaskEvent) -> anyhow::Result<()> {
        tracing::debug!(task_id = %event.task_id(), phase = self.trigger.phase().name(), "task event");

        match event {
            TaskEvent::Generated {
                task_id,
                word,
                content,
            } => {
                if let Some(action) = self.trigger.on_generated(task_id, word, content) {
                    self.run_action(action).await?;
                }
            }
            TaskEvent::GenerationFailed { task_id, error } => {
                if let Some(action) = self.trigger.on_generation_failed(task_id, &error) {
                    self.run_action(action).await?;
                }
            }
            TaskEvent::BackoffElapsed { task_id } => {
                if let Some(completion) = self.trigger.on_backoff_elapsed(task_id) {
                    self.complete(completion).await?;
                }
            }
            TaskEvent::Answered { task_id, answer } => {
                if let Some(completion) = self.trigger.on_answered(task_id, answer) {
                    self.complete(completion).await?;
                }
            }
            TaskEvent::PresentationTimedOut { task_id } => {
                if let Some(completion) = self.trigger.on_presentation_timeout(task_id) {
                    self.complete(completion).await?;
                }
            }
            TaskEvent::PresentationLost { task_id } => {
                if let Some(completion) = self.trigger.on_presentation_lost(task_id) {
                    self.complete(completion).await?;
                }
            }
        }

        Ok(())
    }

    pub(super) async fn run_action(&mut self, action: TriggerAction) -> anyhow::Result<()> {
        match action {
            TriggerAction::Generate(task) => self.spawn_generation(task).await,
            TriggerAction::Present { request, timeout } => {
                self.spawn_presentation(request, timeout).await?
            }
            TriggerAction::Backoff { task_id, delay } => self.spawn_backoff(task_id, delay),
        }
        Ok(())
    }

    /// Drop the in-flight task, e.g. when the page goes away
    pub(super) async fn abort_task(&mut self) -> anyhow::Result<()> {
        if let Some(completion) = self.trigger.abort() {
            self.complete(completion).await?;
        }
        Ok(())
    }

    async fn spawn_generation(&mut self, task: TaskRecord) {
        let (context, policy, manual_test_mode) = {
            let config = self.state.config.read().await;
            (
                self.sampler.selection_context(config.generator.max_context_words),
                ModePolicy::from(&config.quiz),
                config.quiz.manual_test_mode,
            )
        };

        let cancel = self.task_token();
        let state = self.state.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = generate_content(&state, &context, &task.target_language, policy, manual_test_mode) => result,
            };

            let event = match result {
                Ok((word, content)) => TaskEvent::Generated {
                    task_id: task.id,
                    word,
                    content,
                },
                Err(e) => TaskEvent::GenerationFailed {
                    task_id: task.id,
                    error: e.to_string(),
                },
            };
            if let Err(e) = event_tx.send(AppEvent::Task(event)).await {
                tracing::error!("Failed to report generation result: {}", e);
            }
        });
    }

    async fn spawn_presentation(
        &mut self,
        request: PresentRequest,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        let task_id = request.task_id;
        let presentation = self.presenter.present(request).await?;

        let cancel = self.task_token();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = tokio::time::timeout(timeout, presentation) => match result {
                    Ok(Ok(Presentation::Answered(answer))) => TaskEvent::Answered { task_id, answer },
                    Ok(Ok(Presentation::Closed)) | Ok(Err(_)) => TaskEvent::PresentationLost { task_id },
                    Err(_) => TaskEvent::PresentationTimedOut { task_id },
                },
            };
            if let Err(e) = event_tx.send(AppEvent::Task(event)).await {
                tracing::error!("Failed to report presentation result: {}", e);
            }
        });
        Ok(())
    }

    fn spawn_backoff(&mut self, task_id: TaskId, delay: Duration) {
        let cancel = self.task_token();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if let Err(e) = event_tx
                .send(AppEvent::Task(TaskEvent::BackoffElapsed { task_id }))
                .await
            {
                tracing::error!("Failed to report backoff: {}", e);
            }
        });
    }

    async fn complete(&mut self, completion: TaskCompletion) -> anyhow::Result<()> {
        self.presenter.forget(completion.task_id);
        self.cancel_jobs();

        tracing::info!(
            task_id = %completion.task_id,
            sequence = completion.sequence,
            success = completion.success,
            reason = ?completion.reason,
            elapsed_ms = completion.elapsed.as_millis() as u64,
            "task finished"
        );

        if let Some(outcome) = completion.outcome {
            match self.state.stats.record(outcome).await {
                Ok(stats) => tracing::info!(
                    total = stats.total_attempts,
                    correct = stats.correct_answers,
                    score = stats.score(),
                    "quiz result saved"
                ),
                Err(e) => tracing::error!(error = %e, "failed to save quiz result"),
            }
        }

        if completion.consume_progress {
            self.accumulator.consume_progress();
        }
        if completion.reason == CompletionReason::Aborted {
            self.accumulator.on_task_aborted();
        } else {
            let resumed = self.accumulator.on_task_completed(completion.success);
            if resumed.progress_reset || resumed.consecutive_failures > 0 {
                tracing::warn!(
                    failures = resumed.consecutive_failures,
                    progress_reset = resumed.progress_reset,
                    "counter resumed after failed task"
                );
            }
        }

        if !self.state.config.read().await.quiz.auto_launch_enabled {
            self.accumulator.pause();
        }

        self.send_page(progress_message(self.accumulator.progress()))
            .await?;
        self.send_page(ClientMessage::RequestVisibleText).await?;
        self.on_sample(SampleSource::Resample).await
    }

    /// Token shared by every job of the current task
    fn task_token(&mut self) -> CancellationToken {
        self.task_cancel
            .get_or_insert_with(CancellationToken::new)
            .clone()
    }
}

async fn generate_content(
    state: &Arc<AppState>,
    context: &str,
    target_language: &str,
    policy: ModePolicy,
    manual_test_mode: bool,
) -> anyhow::Result<(String, QuizContent)> {
    let word = state.generator.select_word(context).await?;

    let stats = match state.stats.read_aggregate().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(error = %e, "could not read statistics, assuming a new learner");
            QuizStats::default()
        }
    };
    let mode = determine_mode(&stats, &policy, manual_test_mode.then_some(QuizMode::Test));
    tracing::info!(%word, %mode, language = target_language, "generating content");

    let content = state.generator.generate(&word, target_language, mode).await?;
    Ok((word, content))
}
