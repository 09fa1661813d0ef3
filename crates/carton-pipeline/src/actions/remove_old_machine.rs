//! Remove the machine a box is being moved away from.

use async_trait::async_trait;
use carton_core::{Error, Result};

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::actions::rollback_notice;
use crate::context::ActionContext;

/// Best-effort removal: a failing remove is reported to diagnostics and the
/// step still succeeds, passing the previous output through.
#[derive(Debug, Default)]
pub struct RemoveOldMachineAction;

impl RemoveOldMachineAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Action for RemoveOldMachineAction {
    fn name(&self) -> &'static str {
        "remove-old-machine"
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
            .banner(&format!("Removing old machine {}", handle.name()));

        let summary = match handle.machine().remove().await {
            Ok(()) => {
                ctx.progress
                    .detail(&format!("Removed old machine {}", handle.name()));
                format!("Removed old machine {}", handle.name())
            }
            Err(e) => {
                tracing::error!("Ignored error removing old machine {}: {e}", handle.name());
                ctx.diagnostics.ignored(self.name(), &e);
                format!("Old machine {} left in place", handle.name())
            }
        };

        Ok(ActionResult::new(previous.clone(), summary))
    }

    fn on_error(&self, ctx: &ActionContext, err: &Error) {
        rollback_notice(ctx, err);
    }
}
