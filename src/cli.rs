use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "instrument-link",
    about = "real-time event link with dual-tier connection readiness for instrument UIs",
    version
)]
pub struct Args {
    /// Push channel WebSocket endpoint on the local tier
    #[arg(short = 'c', long, default_value = "ws://127.0.0.1:8090/events")]
    pub channel_url: String,

    /// Local-tier liveness endpoint polled during boot
    #[arg(short = 'l', long, default_value = "http://127.0.0.1:8090/health")]
    pub liveness_url: String,

    /// Boot-phase liveness poll interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub poll_interval_ms: u64,

    /// Liveness request timeout in milliseconds
    #[arg(long, default_value = "800")]
    pub liveness_timeout_ms: u64,

    /// Minimum reconnect backoff in milliseconds
    #[arg(long, default_value = "500")]
    pub reconnect_min_ms: u64,

    /// Maximum reconnect backoff in milliseconds
    #[arg(long, default_value = "15000")]
    pub reconnect_max_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Log every dispatched event id
    #[arg(long)]
    pub verbose_events: bool,
}
