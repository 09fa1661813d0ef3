//! Built-in pipeline actions.
//!
//! Each action drives one collaborator call on the target machine or its
//! router, presenting it behind the unified [`Action`](crate::action::Action)
//! trait.

mod add_new_routes;
mod create_machine;
mod follow_logs;
mod machine_command;
mod mark_status;
mod remove_old_machine;
mod remove_old_routes;
mod resolve_machine;
mod update_status;

pub use add_new_routes::AddNewRoutesAction;
pub use create_machine::CreateMachineAction;
pub use follow_logs::FollowLogsAction;
pub use machine_command::MachineCommandAction;
pub use mark_status::MarkStatusAction;
pub use remove_old_machine::RemoveOldMachineAction;
pub use remove_old_routes::RemoveOldRoutesAction;
pub use resolve_machine::ResolveMachineAction;
pub use update_status::UpdateStatusAction;

use carton_core::Error;

use crate::context::ActionContext;

/// Banner written when a route-touching step fails and compensation is about
/// to start.
pub(crate) fn rollback_notice(ctx: &ActionContext, err: &Error) {
    ctx.progress.write_str(&format!(
        "\n**** ROLLING BACK AFTER FAILURE ****\n ---> {err} <---\n"
    ));
}
