use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use tokio_util::sync::CancellationToken;

/// Collapse bursts of pings into one `value` sent `window` after the last ping.
///
/// Returns when either channel closes or `cancel` fires. A burst still
/// pending when the ping channel closes is flushed first.
pub async fn debounce<T: Clone>(
    pings: AsyncReceiver<()>,
    window: Duration,
    out: AsyncSender<T>,
    value: T,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            ping = pings.recv() => {
                if ping.is_err() {
                    return;
                }
            }
            _ = cancel.cancelled() => return,
        }

        let settled = loop {
            tokio::select! {
                ping = pings.recv() => {
                    if ping.is_err() {
                        break false;
                    }
                }
                _ = tokio::time::sleep(window) => break true,
                _ = cancel.cancelled() => return,
            }
        };

        if out.send(value.clone()).await.is_err() || !settled {
            return;
        }
    }
}
