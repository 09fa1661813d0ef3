//! Stream the new machine's logs to the caller's progress writer.

use async_trait::async_trait;
use carton_core::Result;

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::context::ActionContext;

/// Follow the machine's logs until the stream ends. Produces the run's image
/// id; no backward effect.
#[derive(Debug, Default)]
pub struct FollowLogsAction;

impl FollowLogsAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Action for FollowLogsAction {
    fn name(&self) -> &'static str {
        "follow-logs"
    }

    fn min_params(&self) -> usize {
        1
    }

    fn consumes(&self) -> Option<OutputKind> {
        Some(OutputKind::Machine)
    }

    fn produces(&self) -> OutputKind {
        OutputKind::Image
    }

    async fn forward(&self, ctx: &ActionContext, previous: &StepOutput) -> Result<ActionResult> {
        let handle = previous.require_machine(self.name())?;
        ctx.progress.banner(&format!("Logs for {}", handle.name()));
        if let Err(e) = handle.machine().logs(&ctx.progress).await {
            tracing::error!("Error following logs of {}: {e}", handle.name());
            return Err(e);
        }

        let image = ctx.params.image().unwrap_or_default().to_string();
        Ok(ActionResult::new(
            StepOutput::Image(image),
            format!("Followed logs of {}", handle.name()),
        ))
    }
}
