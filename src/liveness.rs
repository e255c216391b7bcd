// file: src/liveness.rs
// description: boot-phase liveness polling of the local tier

use crate::{
    config::LivenessConfig,
    error::LinkError,
    events::{LinkSignal, SignalSender},
    monitoring::LIVENESS_POLL_COUNTER,
    readiness::ReadinessSnapshot,
};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Builds the production probe: one GET against the liveness endpoint, any
/// 2xx counts as ready. Failures are boot noise, logged at debug only.
pub fn http_probe(
    config: &LivenessConfig,
) -> Result<impl FnMut() -> BoxFuture<'static, bool>, LinkError> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let url = config.url.clone();
    Ok(move || {
        let client = client.clone();
        let url = url.clone();
        async move {
            match client.get(url.as_str()).send().await {
                Ok(response) if response.status().is_success() => true,
                Ok(response) => {
                    debug!(status = %response.status(), "local tier not ready yet");
                    false
                }
                Err(e) => {
                    debug!(error = %e, "liveness poll failed");
                    false
                }
            }
        }
        .boxed()
    })
}

/// Polls `probe` at a fixed interval until the system has been ready once.
///
/// The push channel cannot serve as a liveness signal before the local tier
/// is confirmed up, so this poll bootstraps the first `connect()`. Each
/// successful probe sends [`LinkSignal::LivenessConfirmed`]; the channel's
/// idempotent `connect()` absorbs the repeats. Once `was_system_ready`
/// latches, the loop exits for good and the channel's own open/error
/// signals take over.
pub async fn run_boot_poll<F, Fut>(
    poll_interval: Duration,
    mut probe: F,
    signals: SignalSender,
    mut readiness: watch::Receiver<ReadinessSnapshot>,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // the watch guard must not be held across the probe await, so
            // the wait resolves to a plain unit result
            latched = async {
                readiness
                    .wait_for(|snapshot| snapshot.was_system_ready)
                    .await
                    .map(|_| ())
            } => {
                match latched {
                    Ok(()) => debug!("system was ready; stopping boot liveness poll"),
                    Err(_) => debug!("readiness watch closed; stopping boot liveness poll"),
                }
                return;
            }
            _ = ticker.tick() => {
                LIVENESS_POLL_COUNTER.increment(1);
                if probe().await {
                    debug!("local tier liveness confirmed");
                    if signals.send(LinkSignal::LivenessConfirmed).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::create_signal_channel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn confirms_liveness_after_initial_failures() {
        let (signal_tx, mut signal_rx) = create_signal_channel();
        let (_snapshot_tx, snapshot_rx) = watch::channel(ReadinessSnapshot::default());

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let probe = move || {
            // not ready three times, then up
            let attempt = counted.fetch_add(1, Ordering::SeqCst);
            async move { attempt >= 3 }
        };

        let poll = tokio::spawn(run_boot_poll(
            Duration::from_millis(5),
            probe,
            signal_tx,
            snapshot_rx,
        ));

        let signal = timeout(WAIT, signal_rx.recv()).await.unwrap();
        assert_eq!(signal, Some(LinkSignal::LivenessConfirmed));
        assert!(calls.load(Ordering::SeqCst) >= 4);
        poll.abort();
    }

    #[tokio::test]
    async fn stops_permanently_once_system_was_ready() {
        let (signal_tx, mut signal_rx) = create_signal_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ReadinessSnapshot::default());

        let poll = tokio::spawn(run_boot_poll(
            Duration::from_millis(5),
            || async { true },
            signal_tx,
            snapshot_rx,
        ));

        // polling runs until the latch flips
        let signal = timeout(WAIT, signal_rx.recv()).await.unwrap();
        assert_eq!(signal, Some(LinkSignal::LivenessConfirmed));

        snapshot_tx.send_replace(ReadinessSnapshot {
            is_system_ready: true,
            was_system_ready: true,
            shutting_down: false,
        });
        timeout(WAIT, poll).await.expect("poll did not stop").unwrap();

        // a later disconnect must not resume polling; the watch sender
        // observes no remaining receivers
        snapshot_tx.send_replace(ReadinessSnapshot {
            is_system_ready: false,
            was_system_ready: true,
            shutting_down: false,
        });
        assert!(snapshot_tx.is_closed());
    }

    #[tokio::test]
    async fn exits_when_signal_channel_closes() {
        let (signal_tx, signal_rx) = create_signal_channel();
        drop(signal_rx);
        let (_snapshot_tx, snapshot_rx) = watch::channel(ReadinessSnapshot::default());

        let poll = tokio::spawn(run_boot_poll(
            Duration::from_millis(5),
            || async { true },
            signal_tx,
            snapshot_rx,
        ));
        timeout(WAIT, poll).await.expect("poll did not stop").unwrap();
    }
}
