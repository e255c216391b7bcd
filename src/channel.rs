// file: src/channel.rs
// description: persistent WebSocket push channel to the local tier with autonomous reconnect

use crate::{
    config::Config,
    error::LinkError,
    events::{LinkSignal, SignalSender},
    monitoring::{EVENTS_RECEIVED_COUNTER, RECONNECT_COUNTER},
    readiness::LinkStats,
    registry::{lock_recover, ListenerRegistry},
    types::Envelope,
};
use futures_util::StreamExt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, trace, warn};

/// Owns the single long-lived push connection to the local tier.
///
/// Transport failures never escape: the channel retries forever with
/// jittered exponential backoff and reports each teardown as a
/// [`LinkSignal::ChannelError`], each successful connect as exactly one
/// [`LinkSignal::ChannelOpen`]. Nothing received while disconnected is
/// replayed; consumers refetch through the reconnect notifier instead.
pub struct EventChannel {
    config: Arc<Config>,
    registry: Arc<ListenerRegistry>,
    signals: SignalSender,
    stats: Arc<LinkStats>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventChannel {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ListenerRegistry>,
        signals: SignalSender,
        stats: Arc<LinkStats>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            signals,
            stats,
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        })
    }

    /// Starts the connection loop. Idempotent: returns `false` and does
    /// nothing if the channel is already running.
    pub fn connect(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("connect() called while channel already running");
            return false;
        }
        let channel = Arc::clone(self);
        let handle = tokio::spawn(async move { channel.run().await });
        *lock_recover(&self.task) = Some(handle);
        true
    }

    /// Stops the connection loop at session teardown.
    pub fn shutdown(&self) {
        if let Some(handle) = lock_recover(&self.task).take() {
            handle.abort();
        }
    }

    async fn run(&self) {
        let mut delay = self.config.channel.reconnect_min_delay;
        loop {
            match connect_async(self.config.channel.url.as_str()).await {
                Ok((stream, _)) => {
                    delay = self.config.channel.reconnect_min_delay;
                    let connection_id = self.stats.begin_session();
                    info!(%connection_id, url = %self.config.channel.url, "push channel connected");
                    if self.signals.send(LinkSignal::ChannelOpen).is_err() {
                        break;
                    }
                    match self.stream_events(stream).await {
                        Ok(()) => info!("push channel stream ended"),
                        Err(e) => warn!(error = %e, "push channel stream failed"),
                    }
                }
                Err(e) => {
                    debug!(error = %LinkError::Transport(e), "push channel connect failed");
                }
            }

            self.stats.record_reconnect();
            RECONNECT_COUNTER.increment(1);
            if self.signals.send(LinkSignal::ChannelError).is_err() {
                break;
            }

            let wait = jittered(delay);
            debug!(delay_ms = wait.as_millis() as u64, "retrying push channel connection");
            sleep(wait).await;
            delay = (delay * 2).min(self.config.channel.reconnect_max_delay);
        }
        debug!("signal channel closed; push channel task exiting");
    }

    async fn stream_events(
        &self,
        mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    ) -> Result<(), LinkError> {
        while let Some(frame) = stream.next().await {
            match frame? {
                Message::Text(text) => {
                    if let Err(e) = self.handle_frame(text.as_str()) {
                        warn!(
                            error = %e,
                            frame = %text.chars().take(120).collect::<String>(),
                            "skipping undecodable frame"
                        );
                    }
                }
                Message::Binary(data) => {
                    debug!(len = data.len(), "ignoring binary frame");
                }
                Message::Ping(_) | Message::Pong(_) => {
                    trace!("keepalive frame");
                }
                Message::Close(close) => {
                    warn!(?close, "push channel closed by server");
                    return Err(LinkError::ConnectionClosed);
                }
                Message::Frame(_) => {}
            }
        }
        Ok(())
    }

    fn handle_frame(&self, text: &str) -> Result<(), LinkError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        self.stats.record_event();
        EVENTS_RECEIVED_COUNTER.increment(1);

        let event = envelope.into_event();
        if self.config.logging.verbose_events {
            debug!(id = %event.id, "event received");
        }
        self.registry.dispatch(&event);
        Ok(())
    }
}

// Half-to-full jitter keeps simultaneous clients from reconnecting in step.
fn jittered(delay: Duration) -> Duration {
    delay.mul_f64(0.5 + fastrand::f64() / 2.0)
}
