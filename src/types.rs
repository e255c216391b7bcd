// file: src/types.rs
// description: wire-level message models for the local-tier push channel

use serde::{Deserialize, Serialize};

/// Reserved event id carrying the upstream controller connection status.
pub const UPSTREAM_STATUS_EVENT: &str = "controllerConnection";

/// Reserved event id announcing an upstream shutdown. Marker payload only.
pub const SHUTDOWN_EVENT: &str = "shutdownNotice";

/// One frame on the push channel. `data` is an opaque JSON string; the
/// channel never parses it, consumers do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: String,
}

impl Envelope {
    pub fn into_event(self) -> Event {
        Event {
            id: self.event,
            payload: self.data,
        }
    }
}

/// A decoded event as delivered to registered listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub payload: String,
}

/// Payload of the reserved upstream-status event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpstreamStatus {
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_decodes_with_opaque_payload() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"event":"alerts","data":"{\"level\":\"warn\"}"}"#).unwrap();
        let event = envelope.into_event();
        assert_eq!(event.id, "alerts");
        assert_eq!(event.payload, r#"{"level":"warn"}"#);
    }

    #[test]
    fn envelope_tolerates_missing_data() {
        let envelope: Envelope = serde_json::from_str(r#"{"event":"shutdownNotice"}"#).unwrap();
        assert_eq!(envelope.event, SHUTDOWN_EVENT);
        assert!(envelope.data.is_empty());
    }

    #[test]
    fn upstream_status_round_trips() {
        let status: UpstreamStatus = serde_json::from_str(r#"{"connected":true}"#).unwrap();
        assert!(status.connected);
    }
}
