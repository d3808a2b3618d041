// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Notification surface for engine consumers.
//!
//! The worker reports everything through an [`EventSink`]: per-action trace
//! lines, completed writes, query results and classified failures. Every
//! action produces exactly one completion notification (`saved_id`,
//! `initialised`, `reset_done`, `got_flights`, `got_payloads` or
//! `caught_exception`); `log` and `warning` lines may interleave around it.
//!
//! Only [`log`](EventSink::log) is required; every other method has a
//! default that routes a line through it, so a minimal consumer can get a
//! readable trace for free.

use serde_json::Value;

pub trait EventSink: Send + Sync {
    /// Informational trace line.
    fn log(&self, message: &str);

    /// Recoverable anomaly.
    fn warning(&self, message: &str) {
        self.log(&format!("Warning: {}", message));
    }

    /// A document write completed. `doc_type` is one of
    /// `payload_telemetry`, `listener_telemetry`, `listener_information`.
    fn saved_id(&self, doc_type: &str, doc_id: &str) {
        self.log(&format!("Saved {} doc: {}", doc_type, doc_id));
    }

    /// A `Settings` action built a fresh uploader.
    fn initialised(&self) {
        self.log("Initialised uploader");
    }

    /// A `Reset` action completed.
    fn reset_done(&self) {
        self.log("Settings reset");
    }

    /// An action failed. `kind` is a stable tag from
    /// [`UplinkError::kind`](crate::UplinkError::kind).
    fn caught_exception(&self, kind: &str, message: &str) {
        self.warning(&format!("Caught {}: {}", kind, message));
    }

    /// Result of a `Flights` action.
    fn got_flights(&self, flights: &[Value]) {
        let _ = flights;
        self.log("Discarding flights result");
    }

    /// Result of a `Payloads` action.
    fn got_payloads(&self, payloads: &[Value]) {
        let _ = payloads;
        self.log("Discarding payloads result");
    }
}

/// Sink that forwards everything to the `tracing` subscriber.
///
/// Handy when the embedding application only wants logs and will read query
/// results through its own sink later.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn log(&self, message: &str) {
        tracing::info!(target: "uplink_engine::events", "{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "uplink_engine::events", "{}", message);
    }

    fn caught_exception(&self, kind: &str, message: &str) {
        tracing::warn!(
            target: "uplink_engine::events",
            kind = kind,
            "action failed: {}",
            message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records only `log` lines, exercising the defaults.
    struct LogOnly {
        lines: Mutex<Vec<String>>,
    }

    impl EventSink for LogOnly {
        fn log(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_defaults_route_through_log() {
        let sink = LogOnly {
            lines: Mutex::new(Vec::new()),
        };

        sink.warning("clock skew");
        sink.saved_id("payload_telemetry", "abc");
        sink.initialised();
        sink.reset_done();
        sink.caught_exception("collision_error", "gave up");
        sink.got_flights(&[]);
        sink.got_payloads(&[]);

        let lines = sink.lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                "Warning: clock skew",
                "Saved payload_telemetry doc: abc",
                "Initialised uploader",
                "Settings reset",
                "Warning: Caught collision_error: gave up",
                "Discarding flights result",
                "Discarding payloads result",
            ]
        );
    }
}
