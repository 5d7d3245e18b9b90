use std::sync::Arc;

use kanal::AsyncSender;
use parrot_core::stats::QuizStats;
use parrot_core::store::keys;
use parrot_types::ClientMessage;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

pub fn stats_message(stats: &QuizStats) -> ClientMessage {
    ClientMessage::Stats {
        total_attempts: stats.total_attempts,
        correct_answers: stats.correct_answers,
        incorrect_answers: stats.incorrect_answers,
        score: stats.score(),
        accuracy: stats.accuracy().unwrap_or(0.0),
    }
}

/// Push fresh aggregates to the page whenever the stored statistics change
pub async fn stats_watcher(
    state: Arc<AppState>,
    page_tx: AsyncSender<ClientMessage>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut changes = state.stats.subscribe();

    loop {
        let refresh = tokio::select! {
            change = changes.recv() => match change {
                Ok(change) => change.key.as_deref().is_none_or(|key| key == keys::QUIZ_STATS),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "stats watcher lagged");
                    true
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = cancel.cancelled() => {
                tracing::info!("stats watcher stopping");
                return Ok(());
            }
        };
        if !refresh {
            continue;
        }

        match state.stats.read_aggregate().await {
            Ok(stats) => page_tx.send(stats_message(&stats)).await?,
            Err(e) => tracing::error!(error = %e, "failed to read statistics"),
        }
    }
}
