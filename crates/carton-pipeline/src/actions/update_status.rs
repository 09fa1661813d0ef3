//! Record that an image is being built for the target box.

use async_trait::async_trait;
use carton_core::{MachineStatus, Result};

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::context::ActionContext;

/// Resolve the target machine and mark it `building image`.
///
/// Backward marks the machine `error`.
#[derive(Debug, Default)]
pub struct UpdateStatusAction;

impl UpdateStatusAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Action for UpdateStatusAction {
    fn name(&self) -> &'static str {
        "update-status"
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
        tracing::debug!(
            "Updating status of machine {} (image {})",
            handle.name(),
            ctx.params.image().unwrap_or("-"),
        );
        handle
            .machine()
            .set_status(MachineStatus::BuildingImage)
            .await?;

        Ok(ActionResult::new(
            StepOutput::Machine(handle),
            format!("Status of {} set to {}", unit.name, MachineStatus::BuildingImage),
        ))
    }

    async fn backward(&self, _ctx: &ActionContext, output: &StepOutput) -> Result<()> {
        let handle = output.require_machine(self.name())?;
        handle.machine().set_status(MachineStatus::Error).await
    }
}
