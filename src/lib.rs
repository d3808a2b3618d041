//! # Uplink Engine
//!
//! A client-side uploader for CouchDB-backed radio telemetry databases
//! (habitat-compatible). Ground station software hands received
//! transmissions and listener status to the engine; a single background
//! worker publishes them and reports back through an event sink.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Callers                             │
//! │  • Enqueue actions via UplinkEngine (never blocks)          │
//! │  • Receive results through their EventSink                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                      (unbounded FIFO queue)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Worker task                           │
//! │  • One action at a time, strict enqueue order               │
//! │  • Owns the Uploader and its sequence counters              │
//! │  • Translates every failure into one exception event        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Uploader                             │
//! │  • Content-addressed payload telemetry documents            │
//! │  • get→merge→put retry loop on write conflicts              │
//! │  • Flights / payload-configuration view queries             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   DocumentStore (HTTP)                      │
//! │  • PUT / GET / view against one CouchDB database            │
//! │  • 409 → conflict, I/O → transport, rest → http error       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use uplink_engine::{TracingSink, UplinkConfig, UplinkEngine};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = UplinkEngine::new(Arc::new(TracingSink));
//!
//!     // Configure (this builds the uploader; everything before it fails)
//!     engine.settings(UplinkConfig::new("M0XXX"));
//!
//!     // Tell the network who and where we are
//!     engine.listener_information(json!({"name": "Example listener"}), None);
//!     engine.listener_telemetry(json!({"latitude": 52.0, "longitude": 0.0}), None);
//!
//!     // Upload a received transmission; listeners hearing the same packet
//!     // merge into one document server-side
//!     engine.payload_telemetry(b"$$FOO,1,12:45:00,52.0,0.0,12345*AB\n".to_vec(), None, None);
//!
//!     engine.shutdown();
//!     engine.join().await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: the [`UplinkEngine`] handle, queue and worker
//! - [`uploader`]: the per-configuration [`Uploader`] with the merge loop
//! - [`document`]: pure document constructors and the content address
//! - [`store`]: the [`DocumentStore`] trait, HTTP and in-memory backends
//! - [`events`]: the [`EventSink`] notification trait
//! - [`clock`]: injectable wall clock
//! - [`metrics`]: `metrics`-facade instrumentation

pub mod clock;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod store;
pub mod uploader;

pub use clock::{Clock, SystemClock};
pub use config::UplinkConfig;
pub use document::{content_address, ListenerDocKind};
pub use engine::UplinkEngine;
pub use error::UplinkError;
pub use events::{EventSink, TracingSink};
pub use store::{CouchStore, DocumentStore, InMemoryStore, StoreError, ViewRow};
pub use uploader::Uploader;
