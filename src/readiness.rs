// file: src/readiness.rs
// description: dual-tier readiness state machine and per-session link statistics

use crate::{
    channel::EventChannel,
    events::{LinkSignal, SignalReceiver},
    monitoring::READY_GAUGE,
    notifier::ReconnectNotifier,
    registry::lock_recover,
};
use chrono::{DateTime, Utc};
use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Arc, Mutex,
};
use tokio::sync::watch;
use tracing::{debug, info};

/// The two tier-liveness flags plus the session-sticky flags derived from
/// them. `is_system_ready` is always computed, never stored, so the flags
/// cannot desynchronize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub local_link_ready: bool,
    pub upstream_link_ready: bool,
    pub was_system_ready: bool,
    pub shutting_down: bool,
}

/// Read-only view published to consumers through a watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessSnapshot {
    pub is_system_ready: bool,
    pub was_system_ready: bool,
    pub shutting_down: bool,
}

/// Outcome of applying one signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transition {
    pub changed: bool,
    /// True exactly when the system came back up after having been ready
    /// before. Never true on the first transition to ready.
    pub reconnect_edge: bool,
}

impl ConnectionState {
    pub fn is_system_ready(&self) -> bool {
        self.local_link_ready && self.upstream_link_ready
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        ReadinessSnapshot {
            is_system_ready: self.is_system_ready(),
            was_system_ready: self.was_system_ready,
            shutting_down: self.shutting_down,
        }
    }

    /// Applies one signal. Every transition is a pure function of the
    /// latest-known flags, so reordered or repeated signals converge to the
    /// same state.
    pub fn apply(&mut self, signal: LinkSignal) -> Transition {
        let prev = self.clone();
        match signal {
            // connect() is driven by the controller, not recorded as state
            LinkSignal::LivenessConfirmed => {}
            LinkSignal::ChannelOpen => self.local_link_ready = true,
            LinkSignal::ChannelError => self.local_link_ready = false,
            LinkSignal::UpstreamStatus { connected } => {
                self.upstream_link_ready = connected;
                if connected {
                    // a clean upstream reconnect ends any announced shutdown
                    self.shutting_down = false;
                }
            }
            LinkSignal::ShutdownNotice => self.shutting_down = true,
        }
        if self.is_system_ready() {
            self.was_system_ready = true;
        }
        Transition {
            changed: *self != prev,
            // evaluated against the previous was_system_ready so the edge
            // that establishes readiness for the first time never fires
            reconnect_edge: prev.was_system_ready
                && !prev.is_system_ready()
                && self.is_system_ready(),
        }
    }
}

/// Single-writer task owning the [`ConnectionState`]. Everything that wants
/// to mutate readiness sends a [`LinkSignal`]; consumers only ever see
/// published snapshots.
pub struct ReadinessController {
    state: ConnectionState,
    signals: SignalReceiver,
    snapshot_tx: watch::Sender<ReadinessSnapshot>,
    notifier: Arc<ReconnectNotifier>,
    channel: Arc<EventChannel>,
}

impl ReadinessController {
    pub fn new(
        signals: SignalReceiver,
        notifier: Arc<ReconnectNotifier>,
        channel: Arc<EventChannel>,
    ) -> (Self, watch::Receiver<ReadinessSnapshot>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(ReadinessSnapshot::default());
        (
            Self {
                state: ConnectionState::default(),
                signals,
                snapshot_tx,
                notifier,
                channel,
            },
            snapshot_rx,
        )
    }

    pub async fn run(mut self) {
        while let Some(signal) = self.signals.recv().await {
            if matches!(signal, LinkSignal::LivenessConfirmed) {
                // idempotent; repeated confirmations while polling are no-ops
                self.channel.connect();
            }

            let transition = self.state.apply(signal);
            if transition.changed {
                let snapshot = self.state.snapshot();
                info!(
                    is_system_ready = snapshot.is_system_ready,
                    was_system_ready = snapshot.was_system_ready,
                    shutting_down = snapshot.shutting_down,
                    "readiness state changed"
                );
                READY_GAUGE.set(if snapshot.is_system_ready { 1.0 } else { 0.0 });
                self.snapshot_tx.send_replace(snapshot);
            } else {
                debug!(?signal, "signal applied without state change");
            }

            if transition.reconnect_edge {
                self.notifier.notify();
            }
        }
        debug!("signal channel closed; readiness controller exiting");
    }
}

/// Per-session link statistics, kept alongside the state machine the way the
/// rest of the crate reports them: counters for logs, not control flow.
#[derive(Debug)]
pub struct LinkStats {
    connection_id: Mutex<String>,
    reconnect_count: AtomicU32,
    events_received: AtomicU64,
    last_event_time: Mutex<Option<DateTime<Utc>>>,
}

impl Default for LinkStats {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStats {
    pub fn new() -> Self {
        Self {
            connection_id: Mutex::new(uuid::Uuid::new_v4().to_string()),
            reconnect_count: AtomicU32::new(0),
            events_received: AtomicU64::new(0),
            last_event_time: Mutex::new(None),
        }
    }

    /// Rotates the connection id for a fresh channel session and returns it.
    pub fn begin_session(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        *lock_recover(&self.connection_id) = id.clone();
        id
    }

    pub fn record_reconnect(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
        *lock_recover(&self.last_event_time) = Some(Utc::now());
    }

    pub fn connection_id(&self) -> String {
        lock_recover(&self.connection_id).clone()
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    pub fn last_event_time(&self) -> Option<DateTime<Utc>> {
        *lock_recover(&self.last_event_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_all(state: &mut ConnectionState, signals: &[LinkSignal]) -> Vec<Transition> {
        signals.iter().map(|signal| state.apply(*signal)).collect()
    }

    #[test]
    fn readiness_is_always_derived_from_both_tiers() {
        let signals = [
            LinkSignal::LivenessConfirmed,
            LinkSignal::ChannelOpen,
            LinkSignal::UpstreamStatus { connected: true },
            LinkSignal::ChannelError,
            LinkSignal::ShutdownNotice,
            LinkSignal::ChannelOpen,
            LinkSignal::UpstreamStatus { connected: false },
        ];

        // randomized interleavings all preserve the derivation invariant and
        // the monotonic was_system_ready latch
        for _ in 0..200 {
            let mut state = ConnectionState::default();
            let mut was_ready = false;
            for _ in 0..32 {
                let signal = signals[fastrand::usize(..signals.len())];
                state.apply(signal);
                assert_eq!(
                    state.is_system_ready(),
                    state.local_link_ready && state.upstream_link_ready
                );
                assert!(state.was_system_ready >= was_ready, "latch reverted");
                was_ready = state.was_system_ready;
            }
        }
    }

    #[test]
    fn cold_boot_reaches_ready_without_reconnect_edge() {
        let mut state = ConnectionState::default();
        let transitions = apply_all(
            &mut state,
            &[
                LinkSignal::LivenessConfirmed,
                LinkSignal::ChannelOpen,
                LinkSignal::UpstreamStatus { connected: true },
            ],
        );

        assert!(state.is_system_ready());
        assert!(state.was_system_ready);
        assert!(
            transitions.iter().all(|t| !t.reconnect_edge),
            "first boot must not look like a recovery"
        );
    }

    #[test]
    fn transient_upstream_blip_fires_reconnect_edge_once() {
        let mut state = ConnectionState::default();
        apply_all(
            &mut state,
            &[
                LinkSignal::ChannelOpen,
                LinkSignal::UpstreamStatus { connected: true },
            ],
        );

        let down = state.apply(LinkSignal::UpstreamStatus { connected: false });
        assert!(!state.is_system_ready());
        assert!(state.was_system_ready);
        assert!(down.changed && !down.reconnect_edge);

        let up = state.apply(LinkSignal::UpstreamStatus { connected: true });
        assert!(state.is_system_ready());
        assert!(up.reconnect_edge);

        // repeating the same status is idempotent
        let repeat = state.apply(LinkSignal::UpstreamStatus { connected: true });
        assert!(!repeat.changed && !repeat.reconnect_edge);
    }

    #[test]
    fn local_tier_blip_fires_reconnect_edge() {
        let mut state = ConnectionState::default();
        apply_all(
            &mut state,
            &[
                LinkSignal::ChannelOpen,
                LinkSignal::UpstreamStatus { connected: true },
                LinkSignal::ChannelError,
            ],
        );
        assert!(!state.is_system_ready());

        let reopened = state.apply(LinkSignal::ChannelOpen);
        assert!(reopened.reconnect_edge);
    }

    #[test]
    fn shutdown_notice_is_cleared_only_by_upstream_reconnect() {
        let mut state = ConnectionState::default();
        state.apply(LinkSignal::ShutdownNotice);
        assert!(state.shutting_down);

        // unrelated signals leave the flag alone
        state.apply(LinkSignal::ChannelOpen);
        state.apply(LinkSignal::ChannelError);
        state.apply(LinkSignal::UpstreamStatus { connected: false });
        assert!(state.shutting_down);

        state.apply(LinkSignal::UpstreamStatus { connected: true });
        assert!(!state.shutting_down);
    }

    #[test]
    fn duplicate_open_does_not_fire_reconnect_edge() {
        let mut state = ConnectionState::default();
        apply_all(
            &mut state,
            &[
                LinkSignal::ChannelOpen,
                LinkSignal::UpstreamStatus { connected: true },
            ],
        );

        let duplicate = state.apply(LinkSignal::ChannelOpen);
        assert!(!duplicate.changed);
        assert!(!duplicate.reconnect_edge);
    }

    #[test]
    fn stats_track_sessions_and_events() {
        let stats = LinkStats::new();
        let first_id = stats.connection_id();
        let session_id = stats.begin_session();
        assert_ne!(first_id, session_id);
        assert_eq!(stats.connection_id(), session_id);

        assert!(stats.last_event_time().is_none());
        stats.record_event();
        stats.record_reconnect();
        assert_eq!(stats.events_received(), 1);
        assert_eq!(stats.reconnect_count(), 1);
        assert!(stats.last_event_time().is_some());
    }
}
