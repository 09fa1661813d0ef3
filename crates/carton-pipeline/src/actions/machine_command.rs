//! Lifecycle commands (start, stop, snapshot, disk, ...) on an existing
//! machine.

use async_trait::async_trait;
use carton_core::Result;

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::context::ActionContext;
use crate::provision::MachineCommand;

/// Issue one [`MachineCommand`]. No backward effect.
#[derive(Debug)]
pub struct MachineCommandAction {
    command: MachineCommand,
}

impl MachineCommandAction {
    pub fn new(command: MachineCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> MachineCommand {
        self.command
    }
}

#[async_trait]
impl Action for MachineCommandAction {
    fn name(&self) -> &'static str {
        "machine-command"
    }

    fn min_params(&self) -> usize {
        1
    }

    fn consumes(&self) -> Option<OutputKind> {
        Some(OutputKind::Machine)
    }

    fn produces(&self) -> OutputKind {
        OutputKind::Machine
    }

    async fn forward(&self, ctx: &ActionContext, previous: &StepOutput) -> Result<ActionResult> {
        let handle = previous.require_machine(self.name())?;
        ctx.progress
            .banner(&format!("Running {} on machine {}", self.command, handle.name()));
        handle.machine().command(self.command).await?;
        ctx.progress.detail(&format!("Done: {}", self.command));

        Ok(ActionResult::new(
            previous.clone(),
            format!("Ran {} on {}", self.command, handle.name()),
        ))
    }
}
