// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The worker task: drains the action queue in order and drives the
//! uploader.
//!
//! All uploader state lives here, touched by nothing else. The loop applies
//! one action at a time; a failed action is translated into a single
//! `caught_exception` event and the loop carries on. Nothing terminates the
//! worker except a `Shutdown` action or the queue closing.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::UplinkConfig;
use crate::error::UplinkError;
use crate::events::EventSink;
use crate::store::{CouchStore, DocumentStore};
use crate::uploader::Uploader;

use super::actions::Action;

/// How the worker obtains a store when a `Settings` action arrives.
pub(super) enum StoreProvider {
    /// Build a [`CouchStore`] from the config's URL and database.
    Couch,
    /// Always hand out this store (embedding without a server, tests).
    Fixed(Arc<dyn DocumentStore>),
}

impl StoreProvider {
    fn make(&self, config: &UplinkConfig) -> Result<Arc<dyn DocumentStore>, UplinkError> {
        match self {
            Self::Couch => Ok(Arc::new(CouchStore::new(
                &config.couch_url,
                &config.database,
            )?)),
            Self::Fixed(store) => Ok(Arc::clone(store)),
        }
    }
}

pub(super) struct Worker {
    rx: UnboundedReceiver<Action>,
    sink: Arc<dyn EventSink>,
    provider: StoreProvider,
    clock: Arc<dyn Clock>,
    uploader: Option<Uploader>,
}

impl Worker {
    pub(super) fn new(
        rx: UnboundedReceiver<Action>,
        sink: Arc<dyn EventSink>,
        provider: StoreProvider,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rx,
            sink,
            provider,
            clock,
            uploader: None,
        }
    }

    pub(super) async fn run(mut self) {
        self.sink.log("Started");
        info!("uplink worker started");

        while let Some(action) = self.rx.recv().await {
            self.sink.log(&format!("Running {}", action.describe()));

            if matches!(action, Action::Shutdown) {
                break;
            }

            let name = action.name();
            match self.apply(action).await {
                Ok(()) => crate::metrics::record_action(name, "ok"),
                Err(e) => {
                    crate::metrics::record_action(name, e.kind());
                    debug!(action = name, kind = e.kind(), "action failed");
                    self.sink.caught_exception(e.kind(), &e.to_string());
                }
            }
        }

        self.sink.log("Shutting down");
        info!("uplink worker stopped");
    }

    async fn apply(&mut self, action: Action) -> Result<(), UplinkError> {
        match action {
            Action::Settings(config) => {
                let store = self.provider.make(&config)?;
                // Any previous instance (and its sequence counters) is
                // dropped before the new one exists.
                self.uploader = None;
                self.uploader = Some(Uploader::new(config, store, Arc::clone(&self.clock))?);
                self.sink.initialised();
            }
            Action::Reset => {
                self.uploader = None;
                self.sink.reset_done();
            }
            Action::PayloadTelemetry {
                data,
                metadata,
                time_created,
            } => {
                let uploader = self.uploader()?;
                let id = uploader
                    .payload_telemetry(&data, metadata.as_ref(), time_created)
                    .await?;
                self.sink.saved_id("payload_telemetry", &id);
            }
            Action::ListenerTelemetry { data, time_created } => {
                let uploader = self.uploader_mut()?;
                let id = uploader.listener_telemetry(&data, time_created).await?;
                self.sink.saved_id("listener_telemetry", &id);
            }
            Action::ListenerInformation { data, time_created } => {
                let uploader = self.uploader_mut()?;
                let id = uploader.listener_information(&data, time_created).await?;
                self.sink.saved_id("listener_information", &id);
            }
            Action::Flights => {
                let flights = self.uploader()?.flights().await?;
                self.sink.got_flights(&flights);
            }
            Action::Payloads => {
                let payloads = self.uploader()?.payloads().await?;
                self.sink.got_payloads(&payloads);
            }
            // Handled by the run loop before dispatch
            Action::Shutdown => {}
        }
        Ok(())
    }

    fn uploader(&self) -> Result<&Uploader, UplinkError> {
        self.uploader.as_ref().ok_or(UplinkError::NotInitialised)
    }

    fn uploader_mut(&mut self) -> Result<&mut Uploader, UplinkError> {
        self.uploader.as_mut().ok_or(UplinkError::NotInitialised)
    }
}
