//! Real-time event delivery and dual-tier connection readiness.
//!
//! An instrument UI talks to a local server tier, which proxies a remote
//! instrument-controller backend. This crate owns the single push channel to
//! the local tier, fans incoming events out to registered listeners, and
//! composes the liveness of both tiers into one readiness view: the system
//! is ready only while the channel is open *and* the upstream controller
//! reports itself connected. A sticky `was_system_ready` flag separates
//! "never worked yet" from "worked before, temporarily down", and a
//! reconnect notifier tells consumers when to refetch state that may have
//! changed while the link was out.

/// Persistent push channel to the local tier.
pub mod channel;
/// Command-line argument definitions.
pub mod cli;
/// Runtime configuration model.
pub mod config;
/// Error types used across the crate.
pub mod error;
/// Internal signals between channel, poller and readiness controller.
pub mod events;
/// Boot-phase liveness polling.
pub mod liveness;
/// Metrics setup and global instruments.
pub mod monitoring;
/// Reconnect notifications for consumer refetch.
pub mod notifier;
/// Dual-tier readiness state machine and link statistics.
pub mod readiness;
/// Event listener registry and RAII subscriptions.
pub mod registry;
/// Supervisor wiring and the consumer-facing handle.
pub mod supervisor;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Wire-level message models.
pub mod types;

/// Primary crate error type.
pub use error::LinkError;
