//! Stop routing public traffic to the machine being replaced or destroyed.

use async_trait::async_trait;
use carton_core::{Error, Result};

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::actions::rollback_notice;
use crate::context::ActionContext;
use crate::provision::RouteState;

/// Remove the machine's route if it has one.
///
/// Backward re-adds the route only when this step removed it.
#[derive(Debug, Default)]
pub struct RemoveOldRoutesAction;

impl RemoveOldRoutesAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Action for RemoveOldRoutesAction {
    fn name(&self) -> &'static str {
        "remove-old-routes"
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
        let unit = ctx.params.unit()?;
        let router = ctx.provisioner.router_for(&unit.provider).map_err(|e| {
            tracing::error!("Error resolving router for {}: {e}", unit.provider);
            e
        })?;

        ctx.progress.banner("Removing routes from old machine");
        if !handle.is_routable() {
            ctx.progress
                .detail(&format!("Machine {} has no routes", handle.name()));
            return Ok(ActionResult::new(
                previous.clone(),
                format!("No routes to remove for {}", handle.name()),
            ));
        }

        let address = handle.address();
        router.remove_route(handle.name(), &address).await?;
        handle.release_route();
        ctx.progress.detail(&format!(
            "Removed route from machine {} [{address}]",
            handle.name()
        ));

        Ok(ActionResult::new(
            previous.clone(),
            format!("Unrouted {}", handle.name()),
        ))
    }

    async fn backward(&self, ctx: &ActionContext, output: &StepOutput) -> Result<()> {
        let handle = output.require_machine(self.name())?;
        if handle.route_state() != RouteState::Released {
            return Ok(());
        }
        let unit = ctx.params.unit()?;
        let router = ctx.provisioner.router_for(&unit.provider)?;
        let address = handle.address();

        ctx.progress.banner("Adding back routes to old machine");
        router.add_route(handle.name(), &address).await?;
        handle.mark_routed();
        ctx.progress.detail(&format!(
            "Added route to machine {} [{address}]",
            handle.name()
        ));
        Ok(())
    }

    fn on_error(&self, ctx: &ActionContext, err: &Error) {
        rollback_notice(ctx, err);
    }
}
