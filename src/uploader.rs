//! The synchronous uploader: one instance per `Settings`, owned by the
//! worker task.
//!
//! Holds the configuration, the store client and the per-listener sequence
//! counters, and implements the six operations. "Synchronous" is about the
//! contract, not the signatures: each call runs to completion (or one
//! classified error) before the next begins, because a single worker drives
//! it.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::UplinkConfig;
use crate::document::{self, ListenerDocKind};
use crate::error::UplinkError;
use crate::store::{DocumentStore, StoreError};

/// Tolerated difference between a caller-supplied `time_created` and the
/// local clock before we log about it. Documents are uploaded as-is either
/// way; clock discipline is the caller's responsibility.
const MAX_TIME_SKEW_SECS: i64 = 300;

pub struct Uploader {
    config: UplinkConfig,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    latest_listener_telemetry_seq: u64,
    latest_listener_information_seq: u64,
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("config", &self.config)
            .field("latest_listener_telemetry_seq", &self.latest_listener_telemetry_seq)
            .field("latest_listener_information_seq", &self.latest_listener_information_seq)
            .finish()
    }
}

impl Uploader {
    /// Build an uploader, validating the configuration.
    pub fn new(
        config: UplinkConfig,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, UplinkError> {
        if config.callsign.is_empty() {
            return Err(UplinkError::InvalidArgument(
                "callsign must not be empty".to_string(),
            ));
        }
        if config.max_merge_attempts == 0 {
            return Err(UplinkError::InvalidArgument(
                "max_merge_attempts must be positive".to_string(),
            ));
        }

        Ok(Self {
            config,
            store,
            clock,
            latest_listener_telemetry_seq: 0,
            latest_listener_information_seq: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }

    /// Upload one received payload transmission.
    ///
    /// The document id is the content address of `data`, so every listener
    /// that heard the same transmission writes to the same document. On
    /// conflict the remote body is fetched, its `receivers` map is unioned
    /// with our entry, and the update is retried, up to
    /// `max_merge_attempts` writes in total. If the remote map already has
    /// an entry for our callsign it is overwritten with the fresh one.
    ///
    /// Returns the document id.
    #[tracing::instrument(skip(self, data, metadata), fields(bytes = data.len()))]
    pub async fn payload_telemetry(
        &self,
        data: &[u8],
        metadata: Option<&Value>,
        time_created: Option<i64>,
    ) -> Result<String, UplinkError> {
        let (time_created, time_uploaded) = self.resolve_times(time_created);
        let (id, body) = document::payload_telemetry(
            data,
            metadata,
            time_created,
            time_uploaded,
            &self.config.callsign,
        )?;
        let our_entry = body["receivers"][&self.config.callsign].clone();

        match self.store.put_new(&id, &body).await {
            Ok(()) => {
                crate::metrics::record_write_attempts("payload_telemetry", 1);
                return Ok(id);
            }
            Err(StoreError::Conflict) => {}
            Err(e) => return Err(e.into()),
        }

        // Document exists: someone else heard the same transmission first.
        let mut writes = 1;
        while writes < self.config.max_merge_attempts {
            let (existing, rev) = self.store.get(&id).await?;
            let merged = merge_receiver_entry(existing, &self.config.callsign, &our_entry);

            match self.store.put_update(&id, &rev, &merged).await {
                Ok(()) => {
                    writes += 1;
                    debug!(id = %id, writes = writes, "merged into existing document");
                    crate::metrics::record_write_attempts("payload_telemetry", writes as u64);
                    return Ok(id);
                }
                Err(StoreError::Conflict) => {
                    writes += 1;
                    debug!(id = %id, writes = writes, "conflict during merge, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        crate::metrics::record_write_attempts("payload_telemetry", writes as u64);
        Err(UplinkError::Collision { attempts: writes })
    }

    /// Upload a listener telemetry document (GPS position and the like).
    /// Returns the document id.
    #[tracing::instrument(skip(self, data))]
    pub async fn listener_telemetry(
        &mut self,
        data: &Value,
        time_created: Option<i64>,
    ) -> Result<String, UplinkError> {
        self.latest_listener_telemetry_seq += 1;
        let seq = self.latest_listener_telemetry_seq;
        self.upload_listener_doc(ListenerDocKind::Telemetry, data, time_created, seq)
            .await
    }

    /// Upload a listener information document (name, location, radio).
    /// Returns the document id.
    #[tracing::instrument(skip(self, data))]
    pub async fn listener_information(
        &mut self,
        data: &Value,
        time_created: Option<i64>,
    ) -> Result<String, UplinkError> {
        self.latest_listener_information_seq += 1;
        let seq = self.latest_listener_information_seq;
        self.upload_listener_doc(ListenerDocKind::Information, data, time_created, seq)
            .await
    }

    async fn upload_listener_doc(
        &self,
        kind: ListenerDocKind,
        data: &Value,
        time_created: Option<i64>,
        seq: u64,
    ) -> Result<String, UplinkError> {
        let (time_created, time_uploaded) = self.resolve_times(time_created);

        // The id is random, so the first put is expected to succeed; a
        // conflict means we lost the uuid lottery and simply redraw.
        for attempt in 1..=self.config.max_merge_attempts {
            let (id, body) = document::listener_doc(
                kind,
                data,
                time_created,
                time_uploaded,
                &self.config.callsign,
                seq,
            )?;

            match self.store.put_new(&id, &body).await {
                Ok(()) => {
                    crate::metrics::record_write_attempts(kind.as_str(), attempt as u64);
                    return Ok(id);
                }
                Err(StoreError::Conflict) => {
                    warn!(id = %id, attempt = attempt, "random id collided, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(UplinkError::Collision {
            attempts: self.config.max_merge_attempts,
        })
    }

    /// Fetch the flights whose window covers now, oldest end first.
    ///
    /// Each flight document gains a `_payload_docs` array holding the
    /// payload-configuration documents the view attached to it.
    #[tracing::instrument(skip(self))]
    pub async fn flights(&self) -> Result<Vec<Value>, UplinkError> {
        let now = self.clock.now();
        let params = vec![
            ("include_docs".to_string(), "true".to_string()),
            ("startkey".to_string(), format!("[{}]", now)),
        ];
        let rows = self
            .store
            .view("flight", "end_start_including_payloads", &params)
            .await?;
        crate::metrics::record_view_rows("flight/end_start_including_payloads", rows.len());

        let mut flights: Vec<Value> = Vec::new();
        // Payload-configuration rows follow their flight row; this tracks
        // whether that flight was kept.
        let mut keeping = false;

        for row in rows {
            let Some(doc) = row.doc else { continue };
            match doc.get("type").and_then(Value::as_str) {
                Some("flight") => {
                    let approved = doc.get("approved").and_then(Value::as_bool).unwrap_or(false);
                    let started = doc
                        .get("start")
                        .and_then(Value::as_i64)
                        .or_else(|| row.key.get(1).and_then(Value::as_i64))
                        .map_or(false, |start| start <= now);

                    keeping = approved && started;
                    if keeping {
                        let mut flight = doc;
                        flight["_payload_docs"] = json!([]);
                        flights.push(flight);
                    }
                }
                Some("payload_configuration") => {
                    if keeping {
                        if let Some(Value::Array(docs)) = flights
                            .last_mut()
                            .and_then(|f| f.get_mut("_payload_docs"))
                        {
                            docs.push(doc);
                        }
                    }
                }
                _ => debug!(id = %row.id, "ignoring row of unknown type"),
            }
        }

        flights.sort_by_key(|f| f.get("end").and_then(Value::as_i64).unwrap_or(i64::MAX));
        Ok(flights)
    }

    /// Fetch every known payload-configuration document, in view order.
    #[tracing::instrument(skip(self))]
    pub async fn payloads(&self) -> Result<Vec<Value>, UplinkError> {
        let params = vec![("include_docs".to_string(), "true".to_string())];
        let rows = self
            .store
            .view("payload_configuration", "name_time_created", &params)
            .await?;
        crate::metrics::record_view_rows("payload_configuration/name_time_created", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| row.doc.unwrap_or(row.value))
            .collect())
    }

    fn resolve_times(&self, time_created: Option<i64>) -> (i64, i64) {
        let now = self.clock.now();
        let time_created = match time_created {
            Some(t) if t >= 0 => t,
            _ => now,
        };

        if (time_created - now).abs() > MAX_TIME_SKEW_SECS {
            warn!(
                time_created = time_created,
                now = now,
                "time_created deviates more than {}s from the local clock, uploading as-is",
                MAX_TIME_SKEW_SECS
            );
        }

        (time_created, now)
    }
}

/// Merge our receiver entry into the remote body.
///
/// The remote body is the base: every field it carries other than our own
/// receiver entry is left alone. Our callsign's entry always wins.
fn merge_receiver_entry(mut existing: Value, callsign: &str, entry: &Value) -> Value {
    match existing.get_mut("receivers").and_then(Value::as_object_mut) {
        Some(receivers) => {
            receivers.insert(callsign.to_string(), entry.clone());
        }
        None => {
            warn!("remote document has no receivers map, adding one");
            existing["receivers"] = json!({ callsign: entry });
        }
    }
    existing
}
