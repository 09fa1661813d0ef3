//! Resolve the machine backing the target box.

use async_trait::async_trait;
use carton_core::Result;

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::context::ActionContext;

/// First step of every pipeline that acts on an existing machine.
#[derive(Debug, Default)]
pub struct ResolveMachineAction;

impl ResolveMachineAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Action for ResolveMachineAction {
    fn name(&self) -> &'static str {
        "resolve-machine"
    }

    fn min_params(&self) -> usize {
        1
    }

    fn produces(&self) -> OutputKind {
        OutputKind::Machine
    }

    async fn forward(&self, ctx: &ActionContext, _previous: &StepOutput) -> Result<ActionResult> {
        let unit = ctx.params.unit()?;
        let handle = ctx.provisioner.machine_for(unit).await?;
        let summary = format!("Resolved machine {} at {}", handle.name(), handle.address());
        Ok(ActionResult::new(StepOutput::Machine(handle), summary))
    }
}
