//! Metrics instrumentation for uplink-engine.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the embedding
//! application chooses the exporter (Prometheus, OTEL, ...).
//!
//! # Metric Naming Convention
//! - `uplink_` prefix for all metrics
//! - `_total` suffix for counters
//!
//! # Labels
//! - `action`: settings, reset, payload_telemetry, listener_telemetry,
//!   listener_information, flights, payloads
//! - `status`: ok, or an error kind tag
//! - `doc_type` / `view`: what was written or queried

use metrics::{counter, histogram};

/// Record an action enqueued by a caller.
pub fn record_queued(action: &str) {
    counter!(
        "uplink_queued_actions_total",
        "action" => action.to_string()
    )
    .increment(1);
}

/// Record a completed action and its outcome.
pub fn record_action(action: &str, status: &str) {
    counter!(
        "uplink_actions_total",
        "action" => action.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record how many write attempts one document upload needed (1 = no
/// conflict).
pub fn record_write_attempts(doc_type: &str, attempts: u64) {
    histogram!(
        "uplink_document_write_attempts",
        "doc_type" => doc_type.to_string()
    )
    .record(attempts as f64);
}

/// Record the row count a view query returned.
pub fn record_view_rows(view: &str, rows: usize) {
    histogram!(
        "uplink_view_rows",
        "view" => view.to_string()
    )
    .record(rows as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These verify the API compiles and doesn't panic; with no recorder
    // installed the calls are no-ops.

    #[test]
    fn test_record_queued() {
        record_queued("payload_telemetry");
        record_queued("shutdown");
    }

    #[test]
    fn test_record_action() {
        record_action("payload_telemetry", "ok");
        record_action("flights", "transport_error");
    }

    #[test]
    fn test_record_write_attempts() {
        record_write_attempts("payload_telemetry", 1);
        record_write_attempts("listener_telemetry", 3);
    }

    #[test]
    fn test_record_view_rows() {
        record_view_rows("flight/end_start_including_payloads", 12);
    }
}
