// file: src/supervisor.rs
// description: single-owner wiring of channel, registry, readiness controller and liveness poll

use crate::{
    channel::EventChannel,
    config::Config,
    error::LinkError,
    events::{create_signal_channel, LinkSignal, SignalSender},
    liveness,
    notifier::{ReconnectFn, ReconnectNotifier, ReconnectSubscription},
    readiness::{LinkStats, ReadinessController, ReadinessSnapshot},
    registry::{ListenerFn, ListenerRegistry, Subscription},
    types::{Event, UpstreamStatus, SHUTDOWN_EVENT, UPSTREAM_STATUS_EVENT},
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Builds the process-wide link scope. One supervisor per application
/// session; consumers never construct their own channel.
pub struct LinkSupervisor;

impl LinkSupervisor {
    pub fn start(config: Arc<Config>) -> Result<LinkHandle, LinkError> {
        let probe = liveness::http_probe(&config.liveness)?;
        Ok(Self::start_with_probe(config, probe))
    }

    /// Same wiring with an injected liveness probe. Production goes through
    /// [`LinkSupervisor::start`]; tests script the probe directly.
    pub fn start_with_probe<F, Fut>(config: Arc<Config>, probe: F) -> LinkHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let (signal_tx, signal_rx) = create_signal_channel();
        let registry = ListenerRegistry::new();
        let stats = Arc::new(LinkStats::new());
        let channel = EventChannel::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            signal_tx.clone(),
            Arc::clone(&stats),
        );
        let notifier = ReconnectNotifier::new();
        let (controller, readiness) =
            ReadinessController::new(signal_rx, Arc::clone(&notifier), Arc::clone(&channel));

        // the reserved event ids feed the state machine through the same
        // registry every other consumer uses
        let internal_subs = vec![
            Self::upstream_status_subscription(&registry, signal_tx.clone()),
            Self::shutdown_subscription(&registry, signal_tx.clone()),
        ];

        let controller_task = tokio::spawn(controller.run());
        let poll_task = tokio::spawn(liveness::run_boot_poll(
            config.liveness.poll_interval,
            probe,
            signal_tx,
            readiness.clone(),
        ));
        info!("link supervisor started");

        LinkHandle {
            registry,
            notifier,
            readiness,
            channel,
            stats,
            tasks: vec![controller_task, poll_task],
            _internal_subs: internal_subs,
        }
    }

    fn upstream_status_subscription(
        registry: &Arc<ListenerRegistry>,
        signals: SignalSender,
    ) -> Subscription {
        registry.subscribe(
            UPSTREAM_STATUS_EVENT,
            Arc::new(move |event: &Event| {
                match serde_json::from_str::<UpstreamStatus>(&event.payload) {
                    Ok(status) => {
                        let signal = LinkSignal::UpstreamStatus {
                            connected: status.connected,
                        };
                        if signals.send(signal).is_err() {
                            warn!("upstream status ignored; signal queue closed");
                        }
                    }
                    Err(e) => warn!(error = %e, "malformed upstream status payload"),
                }
            }) as Arc<ListenerFn>,
        )
    }

    fn shutdown_subscription(
        registry: &Arc<ListenerRegistry>,
        signals: SignalSender,
    ) -> Subscription {
        registry.subscribe(
            SHUTDOWN_EVENT,
            Arc::new(move |_event: &Event| {
                if signals.send(LinkSignal::ShutdownNotice).is_err() {
                    warn!("shutdown notice ignored; signal queue closed");
                }
            }) as Arc<ListenerFn>,
        )
    }
}

/// Consumer-facing handle to the link scope: subscriptions, reconnect
/// notifications and the read-only readiness flags.
pub struct LinkHandle {
    registry: Arc<ListenerRegistry>,
    notifier: Arc<ReconnectNotifier>,
    readiness: watch::Receiver<ReadinessSnapshot>,
    channel: Arc<EventChannel>,
    stats: Arc<LinkStats>,
    tasks: Vec<JoinHandle<()>>,
    _internal_subs: Vec<Subscription>,
}

impl LinkHandle {
    pub fn subscribe(&self, event_id: impl Into<String>, callback: Arc<ListenerFn>) -> Subscription {
        self.registry.subscribe(event_id, callback)
    }

    pub fn on_reconnect(&self, callback: Arc<ReconnectFn>) -> ReconnectSubscription {
        self.notifier.on_reconnect(callback)
    }

    /// Reactive readiness view; await `changed()` to observe transitions.
    pub fn readiness(&self) -> watch::Receiver<ReadinessSnapshot> {
        self.readiness.clone()
    }

    pub fn is_system_ready(&self) -> bool {
        self.readiness.borrow().is_system_ready
    }

    pub fn was_system_ready(&self) -> bool {
        self.readiness.borrow().was_system_ready
    }

    pub fn shutting_down(&self) -> bool {
        self.readiness.borrow().shutting_down
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Tears the whole scope down. Only meaningful at application exit.
    pub fn shutdown(self) {
        self.channel.shutdown();
        for task in &self.tasks {
            task.abort();
        }
        info!("link supervisor stopped");
    }
}
