//! The operation taxonomy a classified request resolves to.

use serde::Serialize;
use std::fmt;

/// Every operation the control plane knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Destroy,
    Stateup,
    Start,
    Stop,
    Suspend,
    Restart,
    Upgrade,
    UpdateNetwork,
    ImageCreate,
    ImageDestroy,
    SnapCreate,
    SnapRestore,
    SnapDestroy,
    SnapSaveAs,
    DiskAttach,
    DiskDetach,
    Running,
    Failure,
}

impl OperationKind {
    /// All kinds, in taxonomy order.
    pub const ALL: [OperationKind; 19] = [
        Self::Create,
        Self::Destroy,
        Self::Stateup,
        Self::Start,
        Self::Stop,
        Self::Suspend,
        Self::Restart,
        Self::Upgrade,
        Self::UpdateNetwork,
        Self::ImageCreate,
        Self::ImageDestroy,
        Self::SnapCreate,
        Self::SnapRestore,
        Self::SnapDestroy,
        Self::SnapSaveAs,
        Self::DiskAttach,
        Self::DiskDetach,
        Self::Running,
        Self::Failure,
    ];

    /// Whether this kind accepts the `hard` flag.
    pub fn supports_hard(self) -> bool {
        matches!(self, Self::Stop | Self::Restart)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Destroy => "destroy",
            Self::Stateup => "stateup",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Suspend => "suspend",
            Self::Restart => "restart",
            Self::Upgrade => "upgrade",
            Self::UpdateNetwork => "update_network",
            Self::ImageCreate => "image_create",
            Self::ImageDestroy => "image_destroy",
            Self::SnapCreate => "snap_create",
            Self::SnapRestore => "snap_restore",
            Self::SnapDestroy => "snap_destroy",
            Self::SnapSaveAs => "snap_save_as",
            Self::DiskAttach => "disk_attach",
            Self::DiskDetach => "disk_detach",
            Self::Running => "running",
            Self::Failure => "failure",
        };
        f.write_str(s)
    }
}

/// A classified request: what to do, to which unit, and how forcefully.
///
/// Only the parser constructs these; the fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Operation {
    kind: OperationKind,
    name: String,
    hard: bool,
}

impl Operation {
    pub(crate) fn new(kind: OperationKind, name: impl Into<String>, hard: bool) -> Self {
        debug_assert!(!hard || kind.supports_hard());
        Self {
            kind,
            name: name.into(),
            hard,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Target unit id.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bypass graceful shutdown. Only ever set for stop and restart.
    pub fn hard(&self) -> bool {
        self.hard
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hard {
            write!(f, "hard {} {}", self.kind, self.name)
        } else {
            write!(f, "{} {}", self.kind, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_only_for_stop_and_restart() {
        let hard: Vec<_> = OperationKind::ALL
            .iter()
            .filter(|k| k.supports_hard())
            .collect();
        assert_eq!(hard, vec![&OperationKind::Stop, &OperationKind::Restart]);
    }

    #[test]
    fn display_includes_hard_prefix() {
        let op = Operation::new(OperationKind::Stop, "box-7", true);
        assert_eq!(op.to_string(), "hard stop box-7");
        let op = Operation::new(OperationKind::SnapSaveAs, "box-7", false);
        assert_eq!(op.to_string(), "snap_save_as box-7");
    }

    #[test]
    fn serializes_kind_snake_case() {
        let op = Operation::new(OperationKind::UpdateNetwork, "asm-1", false);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["kind"], "update_network");
        assert_eq!(json["name"], "asm-1");
        assert_eq!(json["hard"], false);
    }
}
