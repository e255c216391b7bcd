use crate::error::LinkError;
use metrics::{counter, gauge, Counter, Gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static EVENTS_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("link_events_received_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("link_reconnect_attempts_total"));
pub static LIVENESS_POLL_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("link_liveness_polls_total"));
pub static READY_GAUGE: LazyLock<Gauge> = LazyLock::new(|| gauge!("link_system_ready"));

pub async fn setup_metrics(port: u16) -> Result<(), LinkError> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "instrument-link")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(_handle) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            EVENTS_RECEIVED_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            LIVENESS_POLL_COUNTER.absolute(0);
            READY_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {}", e);
            Err(LinkError::Metrics(e.to_string()))
        }
    }
}
