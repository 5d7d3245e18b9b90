use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kanal::{AsyncReceiver, AsyncSender};
use parrot_types::{ClientMessage, PageMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tokio_util::sync::CancellationToken;

/// Serve the extension page over WebSocket, one connection at a time.
///
/// Text frames are decoded as [`PageMessage`] and forwarded to `inbound`.
/// Messages from `outbound` are written to the attached page, or dropped
/// while no page is attached. Every closed connection is reported as
/// [`PageMessage::Detached`]. A socket that does not finish the upgrade
/// within `handshake_timeout` is dropped.
pub async fn serve_page(
    listener: TcpListener,
    handshake_timeout: Duration,
    inbound: AsyncSender<PageMessage>,
    outbound: AsyncReceiver<ClientMessage>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "page server listening");

    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                tracing::info!(%peer, "page connecting");
                stream
            }
            message = outbound.recv() => {
                let Ok(message) = message else {
                    return Ok(());
                };
                tracing::debug!(?message, "no page attached, dropping message");
                continue;
            }
            _ = cancel.cancelled() => {
                tracing::info!("page server stopping");
                return Ok(());
            }
        };

        let ws = match tokio::time::timeout(handshake_timeout, accept_async(stream)).await {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "websocket handshake failed");
                continue;
            }
            Err(_) => {
                tracing::warn!(?handshake_timeout, "websocket handshake timed out");
                continue;
            }
        };

        if let Err(e) = handle_page(ws, &inbound, &outbound, &cancel).await {
            tracing::warn!(error = %e, "page connection closed with error");
        }
        inbound.send(PageMessage::Detached).await?;

        if cancel.is_cancelled() {
            return Ok(());
        }
    }
}

async fn handle_page(
    ws: WebSocketStream<TcpStream>,
    inbound: &AsyncSender<PageMessage>,
    outbound: &AsyncReceiver<ClientMessage>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            incoming = read.next() => {
                let msg = match incoming {
                    Some(msg) => msg?,
                    None => return Ok(()),
                };
                if msg.is_close() {
                    return Ok(());
                }
                if !msg.is_text() {
                    continue;
                }
                match serde_json::from_str::<PageMessage>(msg.to_text()?) {
                    Ok(message) => inbound.send(message).await?,
                    Err(e) => tracing::warn!(error = %e, "unrecognized page message"),
                }
            }
            message = outbound.recv() => {
                let Ok(message) = message else {
                    write.send(Message::Close(None)).await?;
                    return Ok(());
                };
                let text = serde_json::to_string(&message)?;
                write.send(Message::Text(text.into())).await?;
            }
            _ = cancel.cancelled() => {
                write.send(Message::Close(None)).await?;
                return Ok(());
            }
        }
    }
}
