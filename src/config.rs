//! Configuration for the uplink engine.
//!
//! # Example
//!
//! ```
//! use uplink_engine::UplinkConfig;
//!
//! // Minimal config (uses defaults)
//! let config = UplinkConfig::new("M0XXX");
//! assert_eq!(config.database, "habitat");
//! assert_eq!(config.max_merge_attempts, 20);
//!
//! // Full config
//! let config = UplinkConfig {
//!     callsign: "M0XXX".into(),
//!     couch_url: "http://habitat.habhub.org".into(),
//!     database: "habitat".into(),
//!     max_merge_attempts: 5,
//! };
//! ```

use serde::Deserialize;

/// Configuration for one uploader instance.
///
/// Applied atomically by the `Settings` action; the running uploader never
/// observes a partial update. A fresh `Settings` replaces the whole instance
/// and zeroes its sequence counters.
#[derive(Debug, Clone, Deserialize)]
pub struct UplinkConfig {
    /// Callsign identifying this listener (must be non-empty)
    pub callsign: String,

    /// Base URL of the CouchDB server
    #[serde(default = "default_couch_url")]
    pub couch_url: String,

    /// Database name on that server
    #[serde(default = "default_database")]
    pub database: String,

    /// Retry budget for conflicting document writes
    #[serde(default = "default_max_merge_attempts")]
    pub max_merge_attempts: u32,
}

fn default_couch_url() -> String {
    "http://habitat.habhub.org".to_string()
}
fn default_database() -> String {
    "habitat".to_string()
}
fn default_max_merge_attempts() -> u32 {
    20
}

impl UplinkConfig {
    /// Config for `callsign` with every other field at its default.
    #[must_use]
    pub fn new(callsign: impl Into<String>) -> Self {
        Self {
            callsign: callsign.into(),
            couch_url: default_couch_url(),
            database: default_database(),
            max_merge_attempts: default_max_merge_attempts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = UplinkConfig::new("TEST");
        assert_eq!(config.callsign, "TEST");
        assert_eq!(config.couch_url, "http://habitat.habhub.org");
        assert_eq!(config.database, "habitat");
        assert_eq!(config.max_merge_attempts, 20);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: UplinkConfig = serde_json::from_str(r#"{"callsign": "2E0XYZ"}"#).unwrap();
        assert_eq!(config.callsign, "2E0XYZ");
        assert_eq!(config.database, "habitat");
        assert_eq!(config.max_merge_attempts, 20);
    }

    #[test]
    fn test_deserialize_overrides() {
        let config: UplinkConfig = serde_json::from_str(
            r#"{"callsign": "TEST", "couch_url": "http://localhost:5984", "database": "habitat_test", "max_merge_attempts": 3}"#,
        )
        .unwrap();
        assert_eq!(config.couch_url, "http://localhost:5984");
        assert_eq!(config.database, "habitat_test");
        assert_eq!(config.max_merge_attempts, 3);
    }
}
