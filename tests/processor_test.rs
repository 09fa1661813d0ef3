//! Request processing: dispatch outcomes, events and the queue consumer.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use carton::catalog::{Catalog, InlineCatalog};
use carton::config::ProcessorConfig;
use carton::processor::{Dispatcher, Outcome, RequestProcessor};
use carton_core::events::{EventBus, EventPayload};
use carton_core::{BoxSpec, Error, Request, Result};
use carton_pipeline::provision::memory::{CallKind, MemoryProvisioner};
use carton_pipeline::PipelineState;
use common::TestHarness;
use tokio::sync::{mpsc, Semaphore};

// -- Helpers ------------------------------------------------------------------

/// Catalog that holds every hydration until `gate` gets permits.
struct GatedCatalog {
    inner: InlineCatalog,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl Catalog for GatedCatalog {
    async fn hydrate(&self, request: &Request) -> Result<BoxSpec> {
        let _open = self
            .gate
            .acquire()
            .await
            .map_err(|_| Error::Internal("gate closed".into()))?;
        self.inner.hydrate(request).await
    }
}

fn count_kind(events: &EventBus, kind: &str) -> usize {
    events
        .recent_events(usize::MAX)
        .iter()
        .filter(|e| common::payload_kind(&e.payload) == kind)
        .count()
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_request_commits() {
    let h = TestHarness::new();
    let outcome = h
        .dispatcher()
        .dispatch(Request::new("asm-1", "state", "create"))
        .await;

    assert_matches!(outcome, Outcome::Committed(ref report) => {
        assert_eq!(report.state, PipelineState::Committed);
        assert_eq!(report.steps[0].name, "update-status");
    });
    assert!(h.provisioner.has_route("one", "asm-1"));
    assert_eq!(
        h.event_kinds(),
        vec!["request_received", "operation_started", "operation_completed"]
    );
    assert!(h.progress.contents().contains("---- Adding routes to new machine ----"));
}

#[tokio::test]
async fn classification_failure_runs_nothing() {
    let h = TestHarness::new();
    let outcome = h
        .dispatcher()
        .dispatch(Request::new("box-7", "control", "bogus"))
        .await;

    assert_matches!(outcome, Outcome::Rejected(Error::Classification { .. }));
    assert!(h.provisioner.calls().is_empty());
    assert_eq!(h.event_kinds(), vec!["request_received", "request_rejected"]);
}

#[tokio::test]
async fn failed_operation_publishes_failing_step() {
    let h = TestHarness::new().with_existing(BoxSpec::new("box-7", "one"), false);
    h.provisioner.fail_on(CallKind::Command, "hypervisor timeout");

    let outcome = h
        .dispatcher()
        .dispatch(Request::new("box-7", "control", "hard-stop"))
        .await;

    assert_matches!(outcome, Outcome::Failed(ref e) => {
        assert_eq!(e.failed_step(), Some("machine-command"));
        assert!(e.is_retryable());
    });

    let events = h.events.recent_events(1);
    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["category"], "machine");
    assert_eq!(json["payload"]["type"], "operation_failed");
    assert_eq!(json["payload"]["step"], "machine-command");
}

#[tokio::test]
async fn dry_run_plans_without_calls() {
    let h = TestHarness::new();
    let outcome = h
        .dispatcher()
        .with_dry_run(true)
        .dispatch(Request::new("asm-1", "state", "destroy"))
        .await;

    assert_matches!(outcome, Outcome::Planned(steps) => {
        assert_eq!(
            steps,
            vec!["resolve-machine", "remove-old-routes", "remove-old-machine", "mark-status"]
        );
    });
    assert!(h.provisioner.calls().is_empty());
}

// ---------------------------------------------------------------------------
// RequestProcessor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn processor_drains_queue_after_senders_drop() {
    let provisioner = MemoryProvisioner::new();
    let dispatcher = Dispatcher::new(
        Arc::new(InlineCatalog::new(common::defaults())),
        Arc::new(provisioner.clone()),
    );
    let settings = ProcessorConfig {
        max_concurrent: 2,
        ..Default::default()
    };

    let (tx, rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let handle = tokio::spawn(RequestProcessor::new(dispatcher, &settings, rx, shutdown_rx).run());

    for i in 0..5 {
        tx.send(Request::new(format!("box-{i}"), "state", "create"))
            .await
            .unwrap();
    }
    tx.send(Request::new("box-x", "nope", "x")).await.unwrap();
    drop(tx);

    assert_eq!(handle.await.unwrap(), 6);
    for i in 0..5 {
        assert!(provisioner.has_route("one", &format!("box-{i}")));
    }
}

#[tokio::test]
async fn processor_stops_on_shutdown() {
    let dispatcher = Dispatcher::new(
        Arc::new(InlineCatalog::new(common::defaults())),
        Arc::new(MemoryProvisioner::new()),
    );

    let (_tx, rx) = mpsc::channel::<Request>(8);
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let handle = tokio::spawn(
        RequestProcessor::new(dispatcher, &ProcessorConfig::default(), rx, shutdown_rx).run(),
    );

    shutdown_tx.send(()).await.unwrap();
    assert_eq!(handle.await.unwrap(), 0);
}

#[tokio::test]
async fn dropped_shutdown_sender_keeps_processing() {
    let provisioner = MemoryProvisioner::new();
    let dispatcher = Dispatcher::new(
        Arc::new(InlineCatalog::new(common::defaults())),
        Arc::new(provisioner.clone()),
    );

    let (tx, rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    drop(shutdown_tx);

    for i in 0..3 {
        tx.send(Request::new(format!("box-{i}"), "state", "create"))
            .await
            .unwrap();
    }
    drop(tx);

    let handled = RequestProcessor::new(dispatcher, &ProcessorConfig::default(), rx, shutdown_rx)
        .run()
        .await;

    assert_eq!(handled, 3);
    assert_eq!(provisioner.count(CallKind::AddRoute), 3);
}

#[tokio::test]
async fn queued_requests_rejected_on_shutdown() {
    let h = TestHarness::new();
    let (tx, rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    for i in 0..3 {
        tx.send(Request::new(format!("box-{i}"), "state", "create"))
            .await
            .unwrap();
    }
    shutdown_tx.send(()).await.unwrap();

    let handled =
        RequestProcessor::new(h.dispatcher(), &ProcessorConfig::default(), rx, shutdown_rx)
            .run()
            .await;

    assert_eq!(handled, 0);
    assert!(h.provisioner.calls().is_empty());
    assert_eq!(count_kind(&h.events, "request_rejected"), 3);
    assert_eq!(count_kind(&h.events, "request_received"), 0);
    assert!(tx.send(Request::new("late", "state", "create")).await.is_err());
}

#[tokio::test]
async fn shutdown_seen_while_permits_exhausted() {
    let gate = Arc::new(Semaphore::new(0));
    let events = Arc::new(EventBus::new(64));
    let catalog = GatedCatalog {
        inner: InlineCatalog::new(common::defaults()),
        gate: Arc::clone(&gate),
    };
    let dispatcher = Dispatcher::new(Arc::new(catalog), Arc::new(MemoryProvisioner::new()))
        .with_events(Arc::clone(&events));
    let settings = ProcessorConfig {
        max_concurrent: 1,
        ..Default::default()
    };
    let mut event_rx = events.subscribe();

    let (tx, rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let handle = tokio::spawn(RequestProcessor::new(dispatcher, &settings, rx, shutdown_rx).run());

    // The first request takes the only permit and parks in the catalog.
    tx.send(Request::new("box-1", "state", "create")).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_matches!(first.payload, EventPayload::RequestReceived { ref cat_id, .. } if cat_id == "box-1");

    tx.send(Request::new("box-2", "state", "create")).await.unwrap();
    shutdown_tx.send(()).await.unwrap();

    let rejected = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
        .await
        .expect("processor did not react to shutdown")
        .unwrap();
    assert_matches!(rejected.payload, EventPayload::RequestRejected { .. });

    gate.add_permits(1);
    assert_eq!(handle.await.unwrap(), 1);
}
