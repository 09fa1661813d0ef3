//! Pipeline executor: runs a sequence of [`Action`]s and, when a step fails,
//! compensates every completed step in reverse order.
//!
//! A run either commits (every forward call succeeded) or is compensated
//! (some forward call failed and backward was attempted for each completed
//! step). Backward failures are reported to [`Diagnostics`](crate::Diagnostics)
//! and never stop the remaining compensations.

use std::fmt;

use carton_core::{Error, Result, RunId};
use tracing::Instrument;

use crate::action::{Action, OutputKind, StepOutput};
use crate::context::ActionContext;

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Running,
    Committed,
    Compensated,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Committed => write!(f, "committed"),
            Self::Compensated => write!(f, "compensated"),
        }
    }
}

/// One completed step of a committed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: &'static str,
    pub summary: String,
}

/// Outcome of a committed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub state: PipelineState,
    pub steps: Vec<StepRecord>,
    /// Output of the last step.
    pub output: StepOutput,
}

/// Runs actions strictly in order.
pub struct PipelineExecutor {
    actions: Vec<Box<dyn Action>>,
}

impl PipelineExecutor {
    /// Create an executor without compose-time checks.
    pub fn new(actions: Vec<Box<dyn Action>>) -> Self {
        Self { actions }
    }

    /// Create an executor after checking that the pipeline is non-empty and
    /// that every step's input matches its predecessor's output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first mismatch.
    pub fn compose(actions: Vec<Box<dyn Action>>) -> Result<Self> {
        if actions.is_empty() {
            return Err(Error::configuration("pipeline has no actions"));
        }

        let mut available = OutputKind::None;
        let mut after = "the start of the pipeline";
        for action in &actions {
            if let Some(needed) = action.consumes() {
                if needed != available {
                    return Err(Error::configuration(format!(
                        "{} needs {needed} but {after} produces {available}",
                        action.name()
                    )));
                }
            }
            available = action.produces();
            after = action.name();
        }

        Ok(Self { actions })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Step names, in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Execute the pipeline.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] when the pipeline is empty or the context
    ///   carries fewer params than some step needs. Nothing has run.
    /// - [`Error::Forward`] naming the failing step. Every step that
    ///   completed before it has been compensated, newest first.
    pub async fn execute(&self, ctx: &ActionContext) -> Result<PipelineReport> {
        let unit = ctx.params.unit().map(|u| u.name.as_str()).unwrap_or("-");
        let span = tracing::info_span!("pipeline", run_id = %ctx.run_id, unit);
        self.run(ctx).instrument(span).await
    }

    async fn run(&self, ctx: &ActionContext) -> Result<PipelineReport> {
        ctx.diagnostics.record_state(PipelineState::Pending);

        if self.actions.is_empty() {
            return Err(Error::configuration("no actions to execute"));
        }

        // Check params for every step before any forward call.
        for action in &self.actions {
            let needed = action.min_params();
            if ctx.params.len() < needed {
                return Err(Error::configuration(format!(
                    "{} needs {needed} params, got {}",
                    action.name(),
                    ctx.params.len()
                )));
            }
        }

        ctx.diagnostics.record_state(PipelineState::Running);
        let total = self.actions.len();
        let mut completed: Vec<StepOutput> = Vec::with_capacity(total);
        let mut steps = Vec::with_capacity(total);
        let mut previous = StepOutput::None;

        for (i, action) in self.actions.iter().enumerate() {
            tracing::info!("[{}/{total}] Starting: {}", i + 1, action.name());
            match action.forward(ctx, &previous).await {
                Ok(result) => {
                    tracing::info!("[{}/{total}] Completed: {}", i + 1, action.name());
                    steps.push(StepRecord {
                        name: action.name(),
                        summary: result.summary,
                    });
                    completed.push(result.output.clone());
                    previous = result.output;
                }
                Err(e) => {
                    tracing::error!("Step {} failed: {e}", action.name());
                    action.on_error(ctx, &e);
                    self.compensate(ctx, &completed).await;
                    ctx.diagnostics.record_state(PipelineState::Compensated);
                    return Err(Error::forward(action.name(), e));
                }
            }
        }

        ctx.diagnostics.record_state(PipelineState::Committed);
        Ok(PipelineReport {
            run_id: ctx.run_id,
            state: PipelineState::Committed,
            steps,
            output: previous,
        })
    }

    /// Call backward on completed steps in reverse order, each with the
    /// output it produced.
    async fn compensate(&self, ctx: &ActionContext, completed: &[StepOutput]) {
        for (action, output) in self.actions.iter().zip(completed).rev() {
            tracing::info!("Compensating: {}", action.name());
            if let Err(e) = action.backward(ctx, output).await {
                ctx.diagnostics.compensation_failed(action.name(), &e);
            }
        }
    }
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("actions", &self.names())
            .finish()
    }
}
