use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use parrot_io::debounce::debounce;
use parrot_io::ws::serve_page;
use parrot_types::{AppEvent, ClientMessage, PageMessage, SampleSource};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::event_loop;
use crate::state::AppState;
use crate::watch::stats_watcher;

/// Centralized channel management
pub struct ChannelSet {
    pub events: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    pub from_page: (AsyncSender<PageMessage>, AsyncReceiver<PageMessage>),
    pub to_page: (AsyncSender<ClientMessage>, AsyncReceiver<ClientMessage>),
    pub scroll: (AsyncSender<()>, AsyncReceiver<()>),
    pub mutation: (AsyncSender<()>, AsyncReceiver<()>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            events: kanal::bounded_async(256),
            from_page: kanal::bounded_async(256),
            to_page: kanal::bounded_async(256),
            scroll: kanal::bounded_async(64),
            mutation: kanal::bounded_async(64),
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            channels: ChannelSet::new(),
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    pub async fn spawn_tasks(&self) -> anyhow::Result<JoinSet<anyhow::Result<()>>> {
        let (network, counter) = {
            let config = self.state.config.read().await;
            (config.network.clone(), config.counter.clone())
        };
        let listener = TcpListener::bind(&network.bind_addr).await?;

        let mut tasks = JoinSet::new();

        // Event loop
        tasks.spawn(event_loop(
            self.state.clone(),
            self.channels.events.1.clone(),
            self.channels.events.0.clone(),
            self.channels.to_page.0.clone(),
            self.cancel_token.child_token(),
        ));

        // Page socket
        tasks.spawn(serve_page(
            listener,
            network.handshake_timeout(),
            self.channels.from_page.0.clone(),
            self.channels.to_page.1.clone(),
            self.cancel_token.child_token(),
        ));
        tasks.spawn(route_page_messages(
            self.channels.from_page.1.clone(),
            self.channels.events.0.clone(),
            self.channels.scroll.0.clone(),
            self.channels.mutation.0.clone(),
            self.cancel_token.child_token(),
        ));

        // Sampling stimuli
        for (pings, window, source) in [
            (
                self.channels.scroll.1.clone(),
                counter.scroll_debounce(),
                SampleSource::Scroll,
            ),
            (
                self.channels.mutation.1.clone(),
                counter.mutation_debounce(),
                SampleSource::Mutation,
            ),
        ] {
            let events = self.channels.events.0.clone();
            let cancel = self.cancel_token.child_token();
            tasks.spawn(async move {
                debounce(pings, window, events, AppEvent::Sample(source), cancel).await;
                Ok(())
            });
        }
        tasks.spawn(poll_samples(
            counter.poll_interval(),
            self.channels.events.0.clone(),
            self.channels.to_page.0.clone(),
            self.cancel_token.child_token(),
        ));

        // Stats sync
        tasks.spawn(stats_watcher(
            self.state.clone(),
            self.channels.to_page.0.clone(),
            self.cancel_token.child_token(),
        ));

        Ok(tasks)
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

/// Split raw stimuli off to the debouncers, everything else goes to the loop
pub(crate) async fn route_page_messages(
    from_page: AsyncReceiver<PageMessage>,
    events: AsyncSender<AppEvent>,
    scroll: AsyncSender<()>,
    mutation: AsyncSender<()>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let message = tokio::select! {
            message = from_page.recv() => message?,
            _ = cancel.cancelled() => return Ok(()),
        };
        match message {
            PageMessage::Scrolled => scroll.send(()).await?,
            PageMessage::Mutated => mutation.send(()).await?,
            other => events.send(AppEvent::Page(other)).await?,
        }
    }
}

/// Backstop sampling on a fixed interval
async fn poll_samples(
    period: std::time::Duration,
    events: AsyncSender<AppEvent>,
    to_page: AsyncSender<ClientMessage>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => return Ok(()),
        }
        events.send(AppEvent::Sample(SampleSource::Poll)).await?;
        // Fresh text for the next tick
        to_page.send(ClientMessage::RequestVisibleText).await?;
    }
}
