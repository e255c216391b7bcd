// file: src/config.rs
// description: runtime configuration model built from CLI arguments

use crate::cli::Args;
use crate::error::LinkError;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub channel: ChannelConfig,
    pub liveness: LivenessConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: Url,
    pub reconnect_min_delay: Duration,
    pub reconnect_max_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct LivenessConfig {
    pub url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub verbose_events: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self, LinkError> {
        let channel_url = Url::parse(&args.channel_url)?;
        let liveness_url = Url::parse(&args.liveness_url)?;

        Ok(Config {
            channel: ChannelConfig {
                url: channel_url,
                reconnect_min_delay: Duration::from_millis(args.reconnect_min_ms),
                reconnect_max_delay: Duration::from_millis(args.reconnect_max_ms),
            },
            liveness: LivenessConfig {
                url: liveness_url,
                poll_interval: Duration::from_millis(args.poll_interval_ms),
                request_timeout: Duration::from_millis(args.liveness_timeout_ms),
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            logging: LoggingConfig {
                verbose_events: args.verbose_events,
            },
        })
    }
}
