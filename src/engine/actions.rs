// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The closed set of commands the engine queue carries.

use serde_json::Value;

use crate::config::UplinkConfig;

/// One queued command. Each variant carries its caller arguments verbatim;
/// the worker interprets them against the current uploader instance.
pub(crate) enum Action {
    Settings(UplinkConfig),
    Reset,
    PayloadTelemetry {
        data: Vec<u8>,
        metadata: Option<Value>,
        time_created: Option<i64>,
    },
    ListenerTelemetry {
        data: Value,
        time_created: Option<i64>,
    },
    ListenerInformation {
        data: Value,
        time_created: Option<i64>,
    },
    Flights,
    Payloads,
    Shutdown,
}

impl Action {
    /// Short tag for metrics labels.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Settings(_) => "settings",
            Self::Reset => "reset",
            Self::PayloadTelemetry { .. } => "payload_telemetry",
            Self::ListenerTelemetry { .. } => "listener_telemetry",
            Self::ListenerInformation { .. } => "listener_information",
            Self::Flights => "flights",
            Self::Payloads => "payloads",
            Self::Shutdown => "shutdown",
        }
    }

    /// Human-readable description for the "Queuing …" / "Running …" trace
    /// lines.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Settings(config) => format!(
                "Uploader('{}', '{}', '{}', {})",
                config.callsign, config.couch_url, config.database, config.max_merge_attempts
            ),
            Self::Reset => "~Uploader()".to_string(),
            Self::PayloadTelemetry {
                data,
                metadata,
                time_created,
            } => format!(
                "Uploader.payload_telemetry('{}', {}, {})",
                String::from_utf8_lossy(data).escape_default(),
                metadata
                    .as_ref()
                    .map_or_else(|| "null".to_string(), Value::to_string),
                describe_time(*time_created)
            ),
            Self::ListenerTelemetry { data, time_created } => format!(
                "Uploader.listener_telemetry({}, {})",
                data,
                describe_time(*time_created)
            ),
            Self::ListenerInformation { data, time_created } => format!(
                "Uploader.listener_information({}, {})",
                data,
                describe_time(*time_created)
            ),
            Self::Flights => "Uploader.flights()".to_string(),
            Self::Payloads => "Uploader.payloads()".to_string(),
            Self::Shutdown => "Shutdown".to_string(),
        }
    }
}

fn describe_time(time_created: Option<i64>) -> String {
    match time_created {
        Some(t) => t.to_string(),
        None => "now".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_settings() {
        let action = Action::Settings(UplinkConfig::new("TEST"));
        assert_eq!(
            action.describe(),
            "Uploader('TEST', 'http://habitat.habhub.org', 'habitat', 20)"
        );
    }

    #[test]
    fn test_describe_payload_telemetry() {
        let action = Action::PayloadTelemetry {
            data: b"$$FOO\n".to_vec(),
            metadata: Some(json!({})),
            time_created: Some(1_300_000_000),
        };
        assert_eq!(
            action.describe(),
            "Uploader.payload_telemetry('$$FOO\\n', {}, 1300000000)"
        );
    }

    #[test]
    fn test_describe_listener_telemetry_defaults() {
        let action = Action::ListenerTelemetry {
            data: json!({"lat": 52.0}),
            time_created: None,
        };
        assert_eq!(
            action.describe(),
            "Uploader.listener_telemetry({\"lat\":52.0}, now)"
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(Action::Reset.name(), "reset");
        assert_eq!(Action::Flights.name(), "flights");
        assert_eq!(Action::Shutdown.name(), "shutdown");
    }
}
