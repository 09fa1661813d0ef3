//! Request processing: classify, hydrate, plan and run each inbound request.
//!
//! [`Dispatcher`] handles one request end to end. [`RequestProcessor`] pulls
//! requests off a queue and runs one dispatcher task per request, bounded by
//! `processor.max_concurrent`.

use std::sync::Arc;

use carton_core::events::{EventBus, EventCategory, EventPayload};
use carton_core::{Error, Request};
use carton_pipeline::{
    build_pipeline, ActionContext, Params, PipelineReport, ProgressWriter, Provisioner,
};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::catalog::Catalog;
use crate::config::ProcessorConfig;

/// What happened to one request.
#[derive(Debug)]
pub enum Outcome {
    /// Parsing, hydration or planning failed; nothing ran.
    Rejected(Error),
    /// Dry run: the steps that would have run.
    Planned(Vec<&'static str>),
    Committed(PipelineReport),
    /// A step failed; completed steps were compensated.
    Failed(Error),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Planned(_) | Self::Committed(_))
    }
}

/// Runs a single request through parse, hydrate, plan and execute.
pub struct Dispatcher {
    catalog: Arc<dyn Catalog>,
    provisioner: Arc<dyn Provisioner>,
    events: Arc<EventBus>,
    progress: ProgressWriter,
    dry_run: bool,
}

impl Dispatcher {
    pub fn new(catalog: Arc<dyn Catalog>, provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            catalog,
            provisioner,
            events: Arc::new(EventBus::default()),
            progress: ProgressWriter::discard(),
            dry_run: false,
        }
    }

    /// Builder: publish lifecycle events on a shared bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Builder: stream step banners and machine logs to `progress`.
    pub fn with_progress(mut self, progress: ProgressWriter) -> Self {
        self.progress = progress;
        self
    }

    /// Builder: plan requests without executing them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub async fn dispatch(&self, request: Request) -> Outcome {
        tracing::info!("Received {request}");
        self.events.broadcast(
            EventCategory::User,
            EventPayload::RequestReceived {
                request_id: request.id.clone(),
                cat_id: request.cat_id.clone(),
            },
        );

        let op = match carton_parser::parse_request(&request) {
            Ok(op) => op,
            Err(e) => return self.reject(&request, e),
        };
        let unit = match self.catalog.hydrate(&request).await {
            Ok(unit) => unit,
            Err(e) => return self.reject(&request, e),
        };
        let executor = match build_pipeline(&op) {
            Ok(executor) => executor,
            Err(e) => return self.reject(&request, e),
        };

        if self.dry_run {
            let steps = executor.names();
            tracing::info!("[DRY RUN] Would run {op}: {}", steps.join(" -> "));
            return Outcome::Planned(steps);
        }

        let ctx = ActionContext::new(Arc::clone(&self.provisioner), Params::for_box(unit))
            .with_progress(self.progress.clone());
        self.events.broadcast(
            EventCategory::Machine,
            EventPayload::OperationStarted {
                request_id: request.id.clone(),
                run_id: ctx.run_id,
                operation: op.to_string(),
                target: op.name().to_string(),
            },
        );

        match executor.execute(&ctx).await {
            Ok(report) => {
                tracing::info!("Operation {op} committed ({} steps)", report.steps.len());
                self.events.broadcast(
                    EventCategory::Machine,
                    EventPayload::OperationCompleted {
                        request_id: request.id.clone(),
                        run_id: ctx.run_id,
                    },
                );
                Outcome::Committed(report)
            }
            Err(e) => {
                tracing::error!(
                    retryable = e.is_retryable(),
                    "Operation {op} failed: {e}"
                );
                self.events.broadcast(
                    EventCategory::Machine,
                    EventPayload::OperationFailed {
                        request_id: request.id.clone(),
                        run_id: ctx.run_id,
                        step: e.failed_step().map(str::to_string),
                        error: e.to_string(),
                    },
                );
                Outcome::Failed(e)
            }
        }
    }

    /// Report a request that was queued but never run.
    pub fn abandon(&self, request: &Request) {
        tracing::warn!("Dropping {request}: processor shut down before it ran");
        self.events.broadcast(
            EventCategory::User,
            EventPayload::RequestRejected {
                request_id: request.id.clone(),
                error: "processor shut down before the request ran".to_string(),
            },
        );
    }

    fn reject(&self, request: &Request, err: Error) -> Outcome {
        tracing::warn!("Rejected {request}: {err}");
        self.events.broadcast(
            EventCategory::User,
            EventPayload::RequestRejected {
                request_id: request.id.clone(),
                error: err.to_string(),
            },
        );
        Outcome::Rejected(err)
    }
}

/// Queue consumer running one task per request.
pub struct RequestProcessor {
    dispatcher: Arc<Dispatcher>,
    max_concurrent: usize,
    requests: mpsc::Receiver<Request>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl RequestProcessor {
    pub fn new(
        dispatcher: Dispatcher,
        settings: &ProcessorConfig,
        requests: mpsc::Receiver<Request>,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher.with_dry_run(settings.dry_run)),
            max_concurrent: settings.max_concurrent.max(1),
            requests,
            shutdown_rx,
        }
    }

    /// Process requests until shutdown or until every sender is dropped, then
    /// wait for in-flight requests. Returns how many requests were handled.
    ///
    /// Requests still queued at shutdown are rejected, not run.
    pub async fn run(mut self) -> usize {
        tracing::info!(
            "Request processor started (max {} concurrent)",
            self.max_concurrent
        );

        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();
        let mut handled = 0;

        'run: loop {
            tokio::select! {
                biased;

                Some(()) = self.shutdown_rx.recv() => {
                    tracing::info!("Request processor shutting down");
                    break 'run;
                }
                Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                    handled += Self::reap(finished);
                }
                permit = Arc::clone(&permits).acquire_owned() => {
                    let Ok(permit) = permit else {
                        break 'run;
                    };
                    tokio::select! {
                        biased;

                        Some(()) = self.shutdown_rx.recv() => {
                            tracing::info!("Request processor shutting down");
                            break 'run;
                        }
                        Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                            handled += Self::reap(finished);
                        }
                        request = self.requests.recv() => {
                            let Some(request) = request else {
                                tracing::info!("Request queue closed");
                                break 'run;
                            };
                            let dispatcher = Arc::clone(&self.dispatcher);
                            tasks.spawn(async move {
                                let _permit = permit;
                                dispatcher.dispatch(request).await
                            });
                        }
                    }
                }
            }
        }

        self.requests.close();
        while let Ok(request) = self.requests.try_recv() {
            self.dispatcher.abandon(&request);
        }

        // Drain in-flight requests.
        while let Some(finished) = tasks.join_next().await {
            handled += Self::reap(finished);
        }
        tracing::info!("Request processor stopped after {handled} requests");
        handled
    }

    fn reap(finished: Result<Outcome, tokio::task::JoinError>) -> usize {
        match finished {
            Ok(outcome) => {
                tracing::debug!("Request finished: success={}", outcome.is_success());
                1
            }
            Err(e) => {
                tracing::error!("Request task failed: {e}");
                0
            }
        }
    }
}
