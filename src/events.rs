// file: src/events.rs
// description: internal signal bus between the channel, liveness poller and readiness controller

use tokio::sync::mpsc;

/// Signals that drive the readiness state machine. Only the controller task
/// consumes these; everything else holds a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSignal {
    /// Boot-phase liveness poll saw the local tier answer.
    LivenessConfirmed,
    /// Push channel established a connection. One per successful connect.
    ChannelOpen,
    /// Push channel lost its connection. The channel retries on its own.
    ChannelError,
    /// Upstream controller status as reported over the channel.
    UpstreamStatus { connected: bool },
    /// Upstream announced it is shutting down.
    ShutdownNotice,
}

// Unbounded: an upstream-reported status is authoritative and must never be
// discarded, even mid-burst. Signals are tiny, producers are paced by the
// network, and the controller drains each one with O(1) work.
pub type SignalSender = mpsc::UnboundedSender<LinkSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<LinkSignal>;

pub fn create_signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}
