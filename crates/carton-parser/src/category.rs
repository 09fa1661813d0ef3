//! Request categories and their action tables.
//!
//! The literals here are matched exactly: no case folding, no trimming.

use serde::Serialize;
use std::fmt;

use crate::operation::OperationKind;

/// One accepted action literal within a category.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActionEntry {
    pub literal: &'static str,
    pub kind: OperationKind,
    pub hard: bool,
}

impl ActionEntry {
    const fn soft(literal: &'static str, kind: OperationKind) -> Self {
        Self {
            literal,
            kind,
            hard: false,
        }
    }

    const fn hard(literal: &'static str, kind: OperationKind) -> Self {
        Self {
            literal,
            kind,
            hard: true,
        }
    }
}

const STATE_ACTIONS: &[ActionEntry] = &[
    ActionEntry::soft("create", OperationKind::Create),
    ActionEntry::soft("destroy", OperationKind::Destroy),
    ActionEntry::soft("bootstrapped", OperationKind::Stateup),
    ActionEntry::soft("statedown", OperationKind::Stateup),
];

const CONTROL_ACTIONS: &[ActionEntry] = &[
    ActionEntry::soft("start", OperationKind::Start),
    ActionEntry::soft("stop", OperationKind::Stop),
    ActionEntry::soft("suspend", OperationKind::Suspend),
    ActionEntry::soft("restart", OperationKind::Restart),
    ActionEntry::hard("hard-stop", OperationKind::Stop),
    ActionEntry::hard("hard-restart", OperationKind::Restart),
];

const OPERATIONS_ACTIONS: &[ActionEntry] = &[
    ActionEntry::soft("upgrade", OperationKind::Upgrade),
    ActionEntry::soft("assembly.network.update", OperationKind::UpdateNetwork),
];

const BACKUP_ACTIONS: &[ActionEntry] = &[
    ActionEntry::soft("backupcreate", OperationKind::ImageCreate),
    ActionEntry::soft("backupremove", OperationKind::ImageDestroy),
];

const SNAPSHOT_ACTIONS: &[ActionEntry] = &[
    ActionEntry::soft("snapcreate", OperationKind::SnapCreate),
    ActionEntry::soft("snaprestore", OperationKind::SnapRestore),
    ActionEntry::soft("snapremove", OperationKind::SnapDestroy),
    ActionEntry::soft("snapsave", OperationKind::SnapSaveAs),
];

const DISKS_ACTIONS: &[ActionEntry] = &[
    ActionEntry::soft("attachdisk", OperationKind::DiskAttach),
    ActionEntry::soft("detachdisk", OperationKind::DiskDetach),
];

const DONE_ACTIONS: &[ActionEntry] = &[
    ActionEntry::soft("running", OperationKind::Running),
    ActionEntry::soft("failure", OperationKind::Failure),
];

/// Request category: the first level of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    State,
    Control,
    Operations,
    Backup,
    Snapshot,
    Disks,
    Done,
}

impl Category {
    /// All categories, in dispatch order.
    pub const ALL: [Category; 7] = [
        Self::State,
        Self::Control,
        Self::Operations,
        Self::Backup,
        Self::Snapshot,
        Self::Disks,
        Self::Done,
    ];

    /// Wire literal of this category.
    pub fn literal(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Control => "control",
            Self::Operations => "operations",
            Self::Backup => "backup",
            Self::Snapshot => "snapshot",
            Self::Disks => "disks",
            Self::Done => "done",
        }
    }

    /// Look up a category by its exact wire literal.
    pub fn from_literal(literal: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.literal() == literal)
    }

    /// Wire literals of every category.
    pub fn literals() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.literal()).collect()
    }

    pub(crate) fn actions(self) -> &'static [ActionEntry] {
        match self {
            Self::State => STATE_ACTIONS,
            Self::Control => CONTROL_ACTIONS,
            Self::Operations => OPERATIONS_ACTIONS,
            Self::Backup => BACKUP_ACTIONS,
            Self::Snapshot => SNAPSHOT_ACTIONS,
            Self::Disks => DISKS_ACTIONS,
            Self::Done => DONE_ACTIONS,
        }
    }

    /// Every action literal this category accepts.
    pub fn accepted_actions(self) -> Vec<&'static str> {
        self.actions().iter().map(|a| a.literal).collect()
    }

    /// The allow-list reported back when an action does not match.
    ///
    /// Narrower than [`accepted_actions`](Self::accepted_actions) for some
    /// categories: control omits `suspend` and the `hard-*` forms, operations
    /// omits the network update, snapshot lists only create and remove.
    pub fn advertised_actions(self) -> &'static [&'static str] {
        match self {
            Self::State => &["create", "destroy", "bootstrapped", "statedown"],
            Self::Control => &["start", "stop", "restart"],
            Self::Operations => &["upgrade"],
            Self::Backup => &["backupcreate", "backupremove"],
            Self::Snapshot => &["snapcreate", "snapremove"],
            Self::Disks => &["attachdisk", "detachdisk"],
            Self::Done => &["running", "failure"],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_literal(category.literal()), Some(category));
        }
    }

    #[test]
    fn literals_are_case_sensitive() {
        assert_eq!(Category::from_literal("State"), None);
        assert_eq!(Category::from_literal(" state"), None);
        assert_eq!(Category::from_literal(""), None);
    }

    #[test]
    fn advertised_actions_are_accepted() {
        for category in Category::ALL {
            let accepted = category.accepted_actions();
            for literal in category.advertised_actions() {
                assert!(
                    accepted.contains(literal),
                    "{category} advertises {literal} but does not accept it"
                );
            }
        }
    }

    #[test]
    fn advertised_lists() {
        let advertised: Vec<_> = Category::ALL
            .iter()
            .map(|c| (c.literal(), c.advertised_actions()))
            .collect();
        assert_eq!(
            advertised,
            vec![
                ("state", &["create", "destroy", "bootstrapped", "statedown"][..]),
                ("control", &["start", "stop", "restart"][..]),
                ("operations", &["upgrade"][..]),
                ("backup", &["backupcreate", "backupremove"][..]),
                ("snapshot", &["snapcreate", "snapremove"][..]),
                ("disks", &["attachdisk", "detachdisk"][..]),
                ("done", &["running", "failure"][..]),
            ]
        );
    }

    #[test]
    fn action_literals_unique_within_category() {
        for category in Category::ALL {
            let mut accepted = category.accepted_actions();
            let before = accepted.len();
            accepted.sort_unstable();
            accepted.dedup();
            assert_eq!(accepted.len(), before, "duplicate literal in {category}");
        }
    }

    #[test]
    fn every_kind_reachable() {
        for kind in OperationKind::ALL {
            let reachable = Category::ALL
                .iter()
                .flat_map(|c| c.actions())
                .any(|entry| entry.kind == kind);
            assert!(reachable, "{kind} has no action literal");
        }
    }
}
