//! Create the machine for the target box.

use async_trait::async_trait;
use carton_core::{Error, Result};

use crate::action::{Action, ActionResult, OutputKind, StepOutput};
use crate::context::ActionContext;
use crate::provision::CreateArgs;

/// Create the machine from the run's image and compute spec.
///
/// Backward removes the created machine.
#[derive(Debug, Default)]
pub struct CreateMachineAction;

impl CreateMachineAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Action for CreateMachineAction {
    fn name(&self) -> &'static str {
        "create-machine"
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
        let image = ctx
            .params
            .image()
            .ok_or_else(|| Error::Validation(format!("no image for box {}", unit.name)))?;
        let args = CreateArgs {
            name: handle.name().to_string(),
            image: image.to_string(),
            compute: ctx.params.compute().cloned().unwrap_or_default(),
            provider: unit.provider.clone(),
        };

        ctx.progress
            .banner(&format!("Creating machine {} from {}", args.name, args.image));
        if let Err(e) = handle.machine().create(&args).await {
            tracing::error!("Error creating machine for box {}: {e}", unit.name);
            return Err(e);
        }
        ctx.progress.detail(&format!("Created machine {}", args.name));

        Ok(ActionResult::new(
            previous.clone(),
            format!("Created {} ({})", args.name, args.compute),
        ))
    }

    async fn backward(&self, ctx: &ActionContext, output: &StepOutput) -> Result<()> {
        let handle = output.require_machine(self.name())?;
        ctx.progress
            .banner(&format!("Removing created machine {}", handle.name()));
        handle.machine().remove().await?;
        ctx.progress.detail(&format!("Removed machine {}", handle.name()));
        Ok(())
    }
}
