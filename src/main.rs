use anyhow::Result;
use clap::Parser;
use instrument_link::{
    cli::Args, config::Config, monitoring::setup_metrics, supervisor::LinkSupervisor,
    tracing_setup::setup_tracing,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(&args.log_level, args.json_logs)?;

    info!(
        "Starting instrument-link v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Arc::new(Config::from_args(&args)?);

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    let handle = LinkSupervisor::start(Arc::clone(&config))?;

    // reference consumer: log every recovery so operators can correlate
    // refetch storms with link history
    let _reconnect_log = handle.on_reconnect(Arc::new(|| {
        info!("link recovered; consumers should refetch authoritative state");
    }));

    let mut readiness = handle.readiness();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            changed = readiness.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *readiness.borrow_and_update();
                info!(
                    is_system_ready = snapshot.is_system_ready,
                    was_system_ready = snapshot.was_system_ready,
                    shutting_down = snapshot.shutting_down,
                    connection_id = %handle.stats().connection_id(),
                    events_received = handle.stats().events_received(),
                    "readiness changed"
                );
            }
        }
    }

    handle.shutdown();
    info!("instrument-link stopped");
    Ok(())
}
