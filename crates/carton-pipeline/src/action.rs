//! The [`Action`] trait defines a single pipeline step.
//!
//! Each action performs a forward effect and may declare a backward effect
//! that undoes it. Steps pass a typed [`StepOutput`] along the pipeline; the
//! output a step produced is also what its own backward call receives.

use async_trait::async_trait;
use carton_core::{Error, Result};
use std::fmt;

use crate::context::ActionContext;
use crate::provision::MachineHandle;

/// Value flowing from one step to the next.
#[derive(Debug, Clone, Default)]
pub enum StepOutput {
    #[default]
    None,
    Machine(MachineHandle),
    /// Image id the run produced or consumed.
    Image(String),
}

impl StepOutput {
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::None => OutputKind::None,
            Self::Machine(_) => OutputKind::Machine,
            Self::Image(_) => OutputKind::Image,
        }
    }

    pub fn machine(&self) -> Option<&MachineHandle> {
        match self {
            Self::Machine(handle) => Some(handle),
            _ => None,
        }
    }

    /// The machine handle `step` requires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the output is not a machine handle.
    pub fn require_machine(&self, step: &str) -> Result<&MachineHandle> {
        self.machine().ok_or_else(|| {
            Error::Validation(format!(
                "{step} requires a machine handle, previous step produced {}",
                self.kind()
            ))
        })
    }
}

/// Shape of a [`StepOutput`], used for compose-time checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    None,
    Machine,
    Image,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "nothing"),
            Self::Machine => write!(f, "a machine handle"),
            Self::Image => write!(f, "an image id"),
        }
    }
}

/// Result of a successful forward call.
#[derive(Debug, Clone)]
pub struct ActionResult {
    /// Passed to the next step and kept for this step's backward call.
    pub output: StepOutput,
    /// Human-readable summary of what the action did.
    pub summary: String,
}

impl ActionResult {
    pub fn new(output: StepOutput, summary: impl Into<String>) -> Self {
        Self {
            output,
            summary: summary.into(),
        }
    }
}

/// A single step in a provisioning pipeline.
///
/// Actions hold no per-run state: everything run-scoped lives in the
/// [`ActionContext`] or the [`StepOutput`] values, so one action value may be
/// shared by concurrent runs.
#[async_trait]
pub trait Action: Send + Sync {
    /// Stable step name used in logs and errors (e.g. "create-machine").
    fn name(&self) -> &'static str;

    /// Number of run params this step needs. Checked for every step before
    /// the first forward call.
    fn min_params(&self) -> usize {
        0
    }

    /// Output kind this step requires from its predecessor, or `None` if it
    /// ignores the previous output.
    fn consumes(&self) -> Option<OutputKind> {
        None
    }

    /// Output kind this step produces on success.
    fn produces(&self) -> OutputKind {
        OutputKind::None
    }

    /// Perform the step's effect.
    async fn forward(&self, ctx: &ActionContext, previous: &StepOutput) -> Result<ActionResult>;

    /// Undo a previously successful [`forward`](Action::forward), given the
    /// output it produced.
    ///
    /// Called in reverse order when a later step fails. The default
    /// implementation is a no-op.
    async fn backward(&self, _ctx: &ActionContext, _output: &StepOutput) -> Result<()> {
        Ok(())
    }

    /// Called once when this step's own forward call fails, before any
    /// compensation runs.
    fn on_error(&self, _ctx: &ActionContext, _err: &Error) {}
}
