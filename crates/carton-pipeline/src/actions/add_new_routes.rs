//! Route public traffic to a newly created machine.

use async_trait::async_trait;
use carton_core::{Error, Result};

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::actions::rollback_notice;
use crate::context::ActionContext;

/// Add a route for the machine through the box's provider router and mark
/// the machine routable.
///
/// Backward removes the route, but only while the machine is still routed.
#[derive(Debug, Default)]
pub struct AddNewRoutesAction;

impl AddNewRoutesAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Action for AddNewRoutesAction {
    fn name(&self) -> &'static str {
        "add-new-routes"
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
        let router = ctx.provisioner.router_for(&unit.provider)?;
        let address = handle.address();

        ctx.progress.banner("Adding routes to new machine");
        router.add_route(handle.name(), &address).await?;
        handle.mark_routed();
        ctx.progress.detail(&format!(
            "Added route to machine {} [{address}]",
            handle.name()
        ));

        Ok(ActionResult::new(
            previous.clone(),
            format!("Routed {} via {}", handle.name(), unit.provider),
        ))
    }

    async fn backward(&self, ctx: &ActionContext, output: &StepOutput) -> Result<()> {
        let handle = output.require_machine(self.name())?;
        if !handle.is_routable() {
            return Ok(());
        }
        let unit = ctx.params.unit()?;
        let router = ctx.provisioner.router_for(&unit.provider)?;
        let address = handle.address();

        ctx.progress.banner("Removing routes from created machine");
        router.remove_route(handle.name(), &address).await?;
        handle.mark_unrouted();
        ctx.progress.detail(&format!(
            "Removed route from machine {} [{address}]",
            handle.name()
        ));
        Ok(())
    }

    fn on_error(&self, ctx: &ActionContext, err: &Error) {
        rollback_notice(ctx, err);
    }
}
