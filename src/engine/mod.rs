//! The asynchronous upload engine.
//!
//! [`UplinkEngine`] is a handle over a queue and one background worker task.
//! Callers enqueue actions (never blocking, in any task) and the worker
//! executes them strictly in order, one at a time, reporting every outcome
//! through the [`EventSink`]. A caller submitting A then B is guaranteed
//! A's completion event fires before B's.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialised ──Settings──▶ Ready ──Reset──▶ Uninitialised
//!       │                       │
//!       └────── Shutdown ───────┴──▶ Terminated
//! ```
//!
//! Upload and query actions in *Uninitialised* fail with a
//! `NotInitialisedError` exception event; the worker itself never dies from
//! a failed action.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use uplink_engine::{TracingSink, UplinkConfig, UplinkEngine};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = UplinkEngine::new(Arc::new(TracingSink));
//!
//! engine.settings(UplinkConfig::new("M0XXX"));
//! engine.payload_telemetry(b"$$FOO,1,12:45:00,52.0,0.0,12345*AB\n".to_vec(), None, None);
//! engine.listener_telemetry(json!({"latitude": 52.0, "longitude": 0.0}), None);
//!
//! engine.shutdown();
//! engine.join().await;
//! # }
//! ```

mod actions;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::config::UplinkConfig;
use crate::events::EventSink;
use crate::store::DocumentStore;

use actions::Action;
use worker::{StoreProvider, Worker};

/// Handle to the upload engine: an unbounded action queue plus the single
/// worker task that drains it.
///
/// All methods are callable from any task and return immediately; results
/// arrive through the [`EventSink`] given at construction. Dropping the
/// handle closes the queue, and the worker finishes whatever is already
/// enqueued before stopping.
pub struct UplinkEngine {
    tx: mpsc::UnboundedSender<Action>,
    sink: Arc<dyn EventSink>,
    queued_shutdown: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UplinkEngine {
    /// Spawn an engine that talks to the CouchDB server named by each
    /// `Settings` action.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::spawn(sink, StoreProvider::Couch, Arc::new(SystemClock))
    }

    /// Spawn an engine with an injected store and clock.
    ///
    /// `Settings` actions then configure the uploader but keep using the
    /// given store regardless of their URL. This is the seam for embedding
    /// against [`InMemoryStore`](crate::InMemoryStore) and for tests.
    #[must_use]
    pub fn with_parts(
        sink: Arc<dyn EventSink>,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::spawn(sink, StoreProvider::Fixed(store), clock)
    }

    fn spawn(sink: Arc<dyn EventSink>, provider: StoreProvider, clock: Arc<dyn Clock>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker::new(rx, Arc::clone(&sink), provider, clock);
        let handle = tokio::spawn(worker.run());

        Self {
            tx,
            sink,
            queued_shutdown: AtomicBool::new(false),
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Queue a `Settings` action: build a fresh uploader (sequence counters
    /// zeroed) with this configuration, replacing any existing one.
    pub fn settings(&self, config: UplinkConfig) {
        self.enqueue(Action::Settings(config));
    }

    /// Queue a `Reset`: discard the current uploader and return to the
    /// uninitialised state. A reset while already uninitialised still emits
    /// `reset_done`.
    pub fn reset(&self) {
        self.enqueue(Action::Reset);
    }

    /// Queue a payload telemetry upload of the raw received bytes.
    pub fn payload_telemetry(
        &self,
        data: Vec<u8>,
        metadata: Option<Value>,
        time_created: Option<i64>,
    ) {
        self.enqueue(Action::PayloadTelemetry {
            data,
            metadata,
            time_created,
        });
    }

    /// Queue a listener telemetry upload.
    pub fn listener_telemetry(&self, data: Value, time_created: Option<i64>) {
        self.enqueue(Action::ListenerTelemetry { data, time_created });
    }

    /// Queue a listener information upload.
    pub fn listener_information(&self, data: Value, time_created: Option<i64>) {
        self.enqueue(Action::ListenerInformation { data, time_created });
    }

    /// Queue a flights query; the result arrives via `got_flights`.
    pub fn flights(&self) {
        self.enqueue(Action::Flights);
    }

    /// Queue a payloads query; the result arrives via `got_payloads`.
    pub fn payloads(&self) {
        self.enqueue(Action::Payloads);
    }

    /// Queue a shutdown. Actions enqueued before this still execute; later
    /// calls are swallowed, so shutting down twice is harmless.
    pub fn shutdown(&self) {
        if !self.queued_shutdown.swap(true, Ordering::SeqCst) {
            self.enqueue(Action::Shutdown);
        }
    }

    /// Wait for the worker to stop. Returns immediately if it already has,
    /// or if [`detach`](Self::detach) gave up the handle.
    pub async fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            // The worker has no way to panic back at us; a JoinError here
            // would mean the runtime is shutting down anyway.
            let _ = handle.await;
        }
    }

    /// Relinquish the right to [`join`](Self::join). The worker keeps
    /// running and drains its queue to completion on its own.
    pub fn detach(&self) {
        self.worker.lock().take();
    }

    fn enqueue(&self, action: Action) {
        self.sink.log(&format!("Queuing {}", action.describe()));
        crate::metrics::record_queued(action.name());

        if self.tx.send(action).is_err() {
            // Worker already terminated; nothing will ever drain this.
            self.sink.warning("engine is shut down, dropping action");
        }
    }
}
