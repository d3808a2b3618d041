// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document construction.
//!
//! Pure constructors for the document shapes the database accepts. No I/O
//! happens here; receiver-map merging on conflict is the uploader's job.
//!
//! Payload telemetry documents are content-addressed: the id is the SHA-256
//! hex digest of the base-64 encoding of the raw payload bytes, so every
//! listener that hears the same transmission computes the same id and the
//! documents collide into one `receivers` map on the server.

use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::UplinkError;

/// Which of the two listener document shapes to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerDocKind {
    Telemetry,
    Information,
}

impl ListenerDocKind {
    /// The `type` field value carried by documents of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Telemetry => "listener_telemetry",
            Self::Information => "listener_information",
        }
    }
}

/// Content address of a raw payload: hex SHA-256 of its base-64 encoding.
///
/// The digest is taken over the base-64 text byte-for-byte; there is no
/// normalisation of the raw payload.
#[must_use]
pub fn content_address(data: &[u8]) -> String {
    let encoded = general_purpose::STANDARD.encode(data);
    hex::encode(Sha256::digest(encoded.as_bytes()))
}

/// Build a payload telemetry document.
///
/// Returns `(id, body)` where the id is [`content_address`] of `data`.
/// `metadata` fields (receiver-local extras such as signal strength or
/// frequency) are folded into our receiver entry; the `time_created` and
/// `time_uploaded` keys always win over metadata keys of the same name.
pub fn payload_telemetry(
    data: &[u8],
    metadata: Option<&Value>,
    time_created: i64,
    time_uploaded: i64,
    callsign: &str,
) -> Result<(String, Value), UplinkError> {
    if data.is_empty() {
        return Err(UplinkError::InvalidArgument(
            "payload data must not be empty".to_string(),
        ));
    }

    let receiver = receiver_entry(metadata, time_created, time_uploaded)?;
    let encoded = general_purpose::STANDARD.encode(data);
    let id = hex::encode(Sha256::digest(encoded.as_bytes()));

    let body = json!({
        "data": encoded,
        "receivers": { callsign: receiver },
        "type": "payload_telemetry",
    });

    Ok((id, body))
}

/// Build our entry for a payload telemetry `receivers` map.
pub fn receiver_entry(
    metadata: Option<&Value>,
    time_created: i64,
    time_uploaded: i64,
) -> Result<Value, UplinkError> {
    let mut entry = match metadata {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            return Err(UplinkError::InvalidArgument(format!(
                "metadata must be a JSON object, got {}",
                json_type_name(other)
            )))
        }
    };

    entry.insert("time_created".to_string(), json!(time_created));
    entry.insert("time_uploaded".to_string(), json!(time_uploaded));
    Ok(Value::Object(entry))
}

/// Build a listener telemetry or listener information document.
///
/// The id is a fresh random 128-bit identifier in hex. `seq` is embedded in
/// the data under the reserved `_seq` key so two documents with identical
/// caller data still differ.
pub fn listener_doc(
    kind: ListenerDocKind,
    data: &Value,
    time_created: i64,
    time_uploaded: i64,
    callsign: &str,
    seq: u64,
) -> Result<(String, Value), UplinkError> {
    let mut data = match data {
        Value::Object(map) => map.clone(),
        other => {
            return Err(UplinkError::InvalidArgument(format!(
                "listener data must be a JSON object, got {}",
                json_type_name(other)
            )))
        }
    };
    data.insert("_seq".to_string(), json!(seq));

    let id = Uuid::new_v4().simple().to_string();
    let body = json!({
        "data": data,
        "receiver_callsign": callsign,
        "time_created": time_created,
        "time_uploaded": time_uploaded,
        "type": kind.as_str(),
    });

    Ok((id, body))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64("$$FOO\n") == "JCRGT08K"; sha256 of that text, in hex:
    const FOO_ID: &str = "5f05611ab28686a2392d29d92033a688fe55ff441dcdb43003625a7d221cc6b5";

    #[test]
    fn test_content_address_known_value() {
        assert_eq!(content_address(b"$$FOO\n"), FOO_ID);
    }

    #[test]
    fn test_content_address_is_hex_sha256() {
        let id = content_address(b"some payload");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_payload_telemetry_shape() {
        let (id, body) =
            payload_telemetry(b"$$FOO\n", None, 1_300_000_000, 1_300_000_005, "TEST").unwrap();

        assert_eq!(id, FOO_ID);
        assert_eq!(body["data"], "JCRGT08K");
        assert_eq!(body["type"], "payload_telemetry");
        assert_eq!(body["receivers"]["TEST"]["time_created"], 1_300_000_000);
        assert_eq!(body["receivers"]["TEST"]["time_uploaded"], 1_300_000_005);
    }

    #[test]
    fn test_payload_telemetry_metadata_folded_into_receiver() {
        let metadata = json!({"frequency": 434.075, "signal": -92});
        let (_, body) =
            payload_telemetry(b"$$FOO\n", Some(&metadata), 10, 20, "TEST").unwrap();

        let entry = &body["receivers"]["TEST"];
        assert_eq!(entry["frequency"], 434.075);
        assert_eq!(entry["signal"], -92);
        assert_eq!(entry["time_created"], 10);
    }

    #[test]
    fn test_payload_telemetry_timestamps_win_over_metadata() {
        let metadata = json!({"time_created": 1, "time_uploaded": 2});
        let (_, body) = payload_telemetry(b"X", Some(&metadata), 10, 20, "TEST").unwrap();

        assert_eq!(body["receivers"]["TEST"]["time_created"], 10);
        assert_eq!(body["receivers"]["TEST"]["time_uploaded"], 20);
    }

    #[test]
    fn test_payload_telemetry_rejects_empty_data() {
        let err = payload_telemetry(b"", None, 0, 0, "TEST").unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn test_payload_telemetry_rejects_scalar_metadata() {
        let err = payload_telemetry(b"X", Some(&json!(42)), 0, 0, "TEST").unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert!(err.to_string().contains("number"));

        let err = payload_telemetry(b"X", Some(&json!([1, 2])), 0, 0, "TEST").unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn test_payload_telemetry_null_metadata_is_absent() {
        let (_, body) = payload_telemetry(b"X", Some(&Value::Null), 10, 20, "TEST").unwrap();
        let entry = body["receivers"]["TEST"].as_object().unwrap();
        assert_eq!(entry.len(), 2);
    }

    #[test]
    fn test_listener_doc_shape() {
        let data = json!({"latitude": 52.2, "longitude": 0.1});
        let (id, body) =
            listener_doc(ListenerDocKind::Telemetry, &data, 100, 105, "TEST", 3).unwrap();

        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(body["type"], "listener_telemetry");
        assert_eq!(body["receiver_callsign"], "TEST");
        assert_eq!(body["time_created"], 100);
        assert_eq!(body["time_uploaded"], 105);
        assert_eq!(body["data"]["latitude"], 52.2);
        assert_eq!(body["data"]["_seq"], 3);
    }

    #[test]
    fn test_listener_doc_ids_are_unique() {
        let data = json!({"radio": "FT-817"});
        let (a, _) =
            listener_doc(ListenerDocKind::Information, &data, 0, 0, "TEST", 1).unwrap();
        let (b, _) =
            listener_doc(ListenerDocKind::Information, &data, 0, 0, "TEST", 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_listener_doc_rejects_non_object_data() {
        let err =
            listener_doc(ListenerDocKind::Telemetry, &json!("str"), 0, 0, "TEST", 1).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_listener_doc_kind_strings() {
        assert_eq!(ListenerDocKind::Telemetry.as_str(), "listener_telemetry");
        assert_eq!(ListenerDocKind::Information.as_str(), "listener_information");
    }
}
