//! Shared test harness for carton integration tests.
//!
//! Builds a [`Dispatcher`] wired to an in-memory provisioner, a shared event
//! bus and a captured progress buffer.

#![allow(dead_code)]

use std::sync::Arc;

use carton::catalog::InlineCatalog;
use carton::config::DefaultsConfig;
use carton::processor::Dispatcher;
use carton_core::events::{EventBus, EventPayload};
use carton_core::BoxSpec;
use carton_pipeline::provision::memory::MemoryProvisioner;
use carton_pipeline::{ProgressWriter, SharedBuffer};

pub struct TestHarness {
    pub provisioner: MemoryProvisioner,
    pub events: Arc<EventBus>,
    pub progress: SharedBuffer,
    pub catalog: InlineCatalog,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            provisioner: MemoryProvisioner::new(),
            events: Arc::new(EventBus::new(64)),
            progress: SharedBuffer::new(),
            catalog: InlineCatalog::new(defaults()),
        }
    }

    /// Register a box that already has a machine, optionally routed.
    pub fn with_existing(mut self, unit: BoxSpec, routed: bool) -> Self {
        self.provisioner.seed_machine(&unit, routed);
        self.catalog = self.catalog.with_box(unit);
        self
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::new(self.catalog.clone()),
            Arc::new(self.provisioner.clone()),
        )
        .with_events(Arc::clone(&self.events))
        .with_progress(ProgressWriter::new(self.progress.clone()))
    }

    /// `type` tags of recent events, oldest first.
    pub fn event_kinds(&self) -> Vec<&'static str> {
        let mut events = self.events.recent_events(usize::MAX);
        events.reverse();
        events.iter().map(|e| payload_kind(&e.payload)).collect()
    }
}

pub fn defaults() -> DefaultsConfig {
    DefaultsConfig {
        provider: "one".into(),
        image: "debian-12".into(),
        ..Default::default()
    }
}

pub fn payload_kind(payload: &EventPayload) -> &'static str {
    match payload {
        EventPayload::RequestReceived { .. } => "request_received",
        EventPayload::RequestRejected { .. } => "request_rejected",
        EventPayload::OperationStarted { .. } => "operation_started",
        EventPayload::OperationCompleted { .. } => "operation_completed",
        EventPayload::OperationFailed { .. } => "operation_failed",
    }
}
