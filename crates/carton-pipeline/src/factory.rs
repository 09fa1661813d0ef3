//! Action factory: the action sequence each [`Operation`] runs.

use carton_core::{MachineStatus, Result};
use carton_parser::{Operation, OperationKind};

use crate::action::Action;
use crate::actions::{
    AddNewRoutesAction, CreateMachineAction, FollowLogsAction, MachineCommandAction,
    MarkStatusAction, RemoveOldMachineAction, RemoveOldRoutesAction, ResolveMachineAction,
    UpdateStatusAction,
};
use crate::executor::PipelineExecutor;
use crate::provision::MachineCommand;

/// Build the action list for `op`.
///
/// Every [`OperationKind`] maps to a non-empty plan.
pub fn plan_for(op: &Operation) -> Vec<Box<dyn Action>> {
    match op.kind() {
        OperationKind::Create => vec![
            Box::new(UpdateStatusAction::new()),
            Box::new(CreateMachineAction::new()),
            Box::new(AddNewRoutesAction::new()),
            Box::new(FollowLogsAction::new()),
        ],
        OperationKind::Destroy => vec![
            Box::new(ResolveMachineAction::new()),
            Box::new(RemoveOldRoutesAction::new()),
            Box::new(RemoveOldMachineAction::new()),
            Box::new(MarkStatusAction::new(MachineStatus::Destroyed)),
        ],
        OperationKind::Stateup => mark(MachineStatus::Bootstrapped),
        OperationKind::Running => mark(MachineStatus::Running),
        OperationKind::Failure => mark(MachineStatus::Error),
        kind => command_for(kind, op.hard()).map_or_else(Vec::new, |command| {
            vec![
                Box::new(ResolveMachineAction::new()) as Box<dyn Action>,
                Box::new(MachineCommandAction::new(command)),
            ]
        }),
    }
}

/// [`plan_for`] wrapped in a composed executor.
///
/// # Errors
///
/// Returns [`carton_core::Error::Configuration`] if the plan fails
/// compose-time checks.
pub fn build_pipeline(op: &Operation) -> Result<PipelineExecutor> {
    PipelineExecutor::compose(plan_for(op))
}

fn mark(status: MachineStatus) -> Vec<Box<dyn Action>> {
    vec![
        Box::new(ResolveMachineAction::new()),
        Box::new(MarkStatusAction::new(status)),
    ]
}

fn command_for(kind: OperationKind, hard: bool) -> Option<MachineCommand> {
    let command = match kind {
        OperationKind::Start => MachineCommand::Start,
        OperationKind::Stop => MachineCommand::Stop { hard },
        OperationKind::Restart => MachineCommand::Restart { hard },
        OperationKind::Suspend => MachineCommand::Suspend,
        OperationKind::Upgrade => MachineCommand::Upgrade,
        OperationKind::UpdateNetwork => MachineCommand::UpdateNetwork,
        OperationKind::SnapCreate => MachineCommand::SnapCreate,
        OperationKind::SnapRestore => MachineCommand::SnapRestore,
        OperationKind::SnapDestroy => MachineCommand::SnapDestroy,
        OperationKind::SnapSaveAs => MachineCommand::SnapSaveAs,
        OperationKind::ImageCreate => MachineCommand::ImageCreate,
        OperationKind::ImageDestroy => MachineCommand::ImageDestroy,
        OperationKind::DiskAttach => MachineCommand::DiskAttach,
        OperationKind::DiskDetach => MachineCommand::DiskDetach,
        OperationKind::Create
        | OperationKind::Destroy
        | OperationKind::Stateup
        | OperationKind::Running
        | OperationKind::Failure => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carton_parser::parse;

    fn names(category: &str, action: &str) -> Vec<&'static str> {
        let op = parse(category, action, "box-7").unwrap();
        build_pipeline(&op).unwrap().names()
    }

    #[test]
    fn create_plan() {
        assert_eq!(
            names("state", "create"),
            vec!["update-status", "create-machine", "add-new-routes", "follow-logs"]
        );
    }

    #[test]
    fn destroy_plan() {
        assert_eq!(
            names("state", "destroy"),
            vec![
                "resolve-machine",
                "remove-old-routes",
                "remove-old-machine",
                "mark-status"
            ]
        );
    }

    #[test]
    fn lifecycle_commands_resolve_then_command() {
        assert_eq!(
            names("control", "hard-restart"),
            vec!["resolve-machine", "machine-command"]
        );
        assert_eq!(
            names("done", "running"),
            vec!["resolve-machine", "mark-status"]
        );
    }

    #[test]
    fn hard_flag_reaches_command() {
        assert_eq!(
            command_for(OperationKind::Stop, true),
            Some(MachineCommand::Stop { hard: true })
        );
        assert_eq!(command_for(OperationKind::Create, false), None);
    }

    #[test]
    fn every_kind_has_a_composable_plan() {
        for kind in OperationKind::ALL {
            let has_command = command_for(kind, false).is_some();
            let is_status = matches!(
                kind,
                OperationKind::Create
                    | OperationKind::Destroy
                    | OperationKind::Stateup
                    | OperationKind::Running
                    | OperationKind::Failure
            );
            assert!(has_command ^ is_status, "{kind} is mapped twice or not at all");
        }

        let samples = [
            ("state", "create"),
            ("state", "destroy"),
            ("state", "bootstrapped"),
            ("control", "start"),
            ("control", "hard-stop"),
            ("control", "suspend"),
            ("operations", "upgrade"),
            ("operations", "assembly.network.update"),
            ("backup", "backupcreate"),
            ("backup", "backupremove"),
            ("snapshot", "snapcreate"),
            ("snapshot", "snaprestore"),
            ("snapshot", "snapremove"),
            ("snapshot", "snapsave"),
            ("disks", "attachdisk"),
            ("disks", "detachdisk"),
            ("done", "running"),
            ("done", "failure"),
        ];
        for (category, action) in samples {
            let op = parse(category, action, "box-7").unwrap();
            let executor = build_pipeline(&op)
                .unwrap_or_else(|e| panic!("{category},{action}: {e}"));
            assert!(!executor.is_empty());
        }
    }
}
