//! Record a lifecycle status reported for an existing machine.

use async_trait::async_trait;
use carton_core::{MachineStatus, Result};

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::context::ActionContext;

/// Set a fixed status on the machine. No backward effect.
#[derive(Debug)]
pub struct MarkStatusAction {
    status: MachineStatus,
}

impl MarkStatusAction {
    pub fn new(status: MachineStatus) -> Self {
        Self { status }
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }
}

#[async_trait]
impl Action for MarkStatusAction {
    fn name(&self) -> &'static str {
        "mark-status"
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

    async fn forward(&self, _ctx: &ActionContext, previous: &StepOutput) -> Result<ActionResult> {
        let handle = previous.require_machine(self.name())?;
        handle.machine().set_status(self.status).await?;
        tracing::debug!("Machine {} is now {}", handle.name(), self.status);

        Ok(ActionResult::new(
            previous.clone(),
            format!("Status of {} set to {}", handle.name(), self.status),
        ))
    }
}
