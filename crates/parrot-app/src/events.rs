use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use parrot_core::accumulator::WordAccumulator;
use parrot_core::trigger::TaskTrigger;
use parrot_types::{AppEvent, ClientMessage};
use tokio_util::sync::CancellationToken;

use crate::presenter::PagePresenter;
use crate::sampler::PageSampler;
use crate::state::AppState;

pub mod page;
pub mod sample;
pub mod task;

use sample::ProgressLog;

/// App's main loop. Owns the counter and the task state machine, so
/// every mutation happens on this task.
pub async fn event_loop(
    state: Arc<AppState>,
    event_rx: AsyncReceiver<AppEvent>,
    event_tx: AsyncSender<AppEvent>,
    page_tx: AsyncSender<ClientMessage>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut session = Session::new(state, event_tx, page_tx).await?;

    tracing::info!("[EVENT_LOOP] Starting main loop, waiting for events");
    loop {
        let event = tokio::select! {
            event = event_rx.recv() => event?,
            _ = cancel.cancelled() => {
                session.cancel_jobs();
                tracing::info!(
                    phase = session.trigger().phase().name(),
                    cumulative = session.accumulator().state().cumulative_word_count,
                    "[EVENT_LOOP] Stopping"
                );
                return Ok(());
            }
        };
        session.handle(event).await?;
    }
}

pub struct Session {
    state: Arc<AppState>,
    accumulator: WordAccumulator,
    trigger: TaskTrigger,
    sampler: PageSampler,
    presenter: PagePresenter,
    progress_log: ProgressLog,
    page_url: Option<String>,
    /// Cancels the jobs spawned for the in-flight task
    task_cancel: Option<CancellationToken>,
    event_tx: AsyncSender<AppEvent>,
    page_tx: AsyncSender<ClientMessage>,
}

impl Session {
    pub async fn new(
        state: Arc<AppState>,
        event_tx: AsyncSender<AppEvent>,
        page_tx: AsyncSender<ClientMessage>,
    ) -> anyhow::Result<Self> {
        let (accumulator, trigger) = {
            let config = state.config.read().await;
            let mut accumulator = WordAccumulator::from_config(&config.counter)?;
            if !config.quiz.auto_launch_enabled {
                accumulator.pause();
            }
            (accumulator, TaskTrigger::from_config(&config.trigger))
        };

        Ok(Self {
            state,
            accumulator,
            trigger,
            sampler: PageSampler::new(),
            presenter: PagePresenter::new(page_tx.clone()),
            progress_log: ProgressLog::new(),
            page_url: None,
            task_cancel: None,
            event_tx,
            page_tx,
        })
    }

    pub async fn handle(&mut self, event: AppEvent) -> anyhow::Result<()> {
        match event {
            AppEvent::Page(message) => self.on_page_message(message).await,
            AppEvent::Sample(source) => self.on_sample(source).await,
            AppEvent::Task(event) => self.on_task_event(event).await,
        }
    }

    pub fn accumulator(&self) -> &WordAccumulator {
        &self.accumulator
    }

    pub fn trigger(&self) -> &TaskTrigger {
        &self.trigger
    }

    fn cancel_jobs(&mut self) {
        if let Some(token) = self.task_cancel.take() {
            token.cancel();
        }
    }

    async fn send_page(&self, message: ClientMessage) -> anyhow::Result<()> {
        self.page_tx.send(message).await?;
        Ok(())
    }
}
