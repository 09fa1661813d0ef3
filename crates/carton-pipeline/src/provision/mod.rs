//! Collaborators the pipeline actions drive: machines, routers and the
//! provisioner that resolves both for a box.
//!
//! Implementations live outside this crate (container engines, VM drivers,
//! DNS / load-balancer routers). [`memory`] provides a recording in-memory
//! implementation used by the CLI simulation mode and by tests.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use carton_core::{BoxCompute, BoxSpec, MachineStatus, Result};
use parking_lot::Mutex;

use crate::context::ProgressWriter;

/// Arguments for [`Machine::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArgs {
    pub name: String,
    pub image: String,
    pub compute: BoxCompute,
    pub provider: String,
}

/// Lifecycle commands that need no compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineCommand {
    Start,
    Stop { hard: bool },
    Restart { hard: bool },
    Suspend,
    Upgrade,
    UpdateNetwork,
    SnapCreate,
    SnapRestore,
    SnapDestroy,
    SnapSaveAs,
    ImageCreate,
    ImageDestroy,
    DiskAttach,
    DiskDetach,
}

impl fmt::Display for MachineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop { hard: false } => write!(f, "stop"),
            Self::Stop { hard: true } => write!(f, "hard stop"),
            Self::Restart { hard: false } => write!(f, "restart"),
            Self::Restart { hard: true } => write!(f, "hard restart"),
            Self::Suspend => write!(f, "suspend"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::UpdateNetwork => write!(f, "update network"),
            Self::SnapCreate => write!(f, "create snapshot"),
            Self::SnapRestore => write!(f, "restore snapshot"),
            Self::SnapDestroy => write!(f, "remove snapshot"),
            Self::SnapSaveAs => write!(f, "save snapshot as image"),
            Self::ImageCreate => write!(f, "create backup image"),
            Self::ImageDestroy => write!(f, "remove backup image"),
            Self::DiskAttach => write!(f, "attach disk"),
            Self::DiskDetach => write!(f, "detach disk"),
        }
    }
}

/// A running (or to-be-created) compute instance.
#[async_trait]
pub trait Machine: Send + Sync {
    fn name(&self) -> &str;

    /// Routable address, e.g. `10.0.0.4:8080`.
    fn address(&self) -> String;

    async fn create(&self, args: &CreateArgs) -> Result<()>;

    async fn remove(&self) -> Result<()>;

    /// Stream the machine's logs into `out` until the stream ends.
    async fn logs(&self, out: &ProgressWriter) -> Result<()>;

    async fn set_status(&self, status: MachineStatus) -> Result<()>;

    async fn command(&self, command: MachineCommand) -> Result<()>;
}

/// Public routing (DNS / load balancer) for a provider.
#[async_trait]
pub trait Router: Send + Sync {
    async fn add_route(&self, name: &str, address: &str) -> Result<()>;

    async fn remove_route(&self, name: &str, address: &str) -> Result<()>;
}

/// Resolves collaborators for a box.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Handle on the machine backing `unit`. The handle's route state must
    /// reflect whether the machine is currently routed.
    async fn machine_for(&self, unit: &BoxSpec) -> Result<MachineHandle>;

    /// Router for `provider`.
    fn router_for(&self, provider: &str) -> Result<Arc<dyn Router>>;
}

// ---------------------------------------------------------------------------
// MachineHandle
// ---------------------------------------------------------------------------

/// Whether a machine currently receives public traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    /// Never routed, or routed and then removed by a compensation.
    Unrouted,
    Routed,
    /// Was routed; a pipeline step removed the route.
    Released,
}

/// Shared handle to a machine plus its route state.
///
/// Clones share the route state, so the handle a step captured for
/// compensation sees updates made by later steps.
#[derive(Clone)]
pub struct MachineHandle {
    machine: Arc<dyn Machine>,
    route: Arc<Mutex<RouteState>>,
}

impl MachineHandle {
    /// Handle on an unrouted machine.
    pub fn new(machine: Arc<dyn Machine>) -> Self {
        Self::with_route(machine, RouteState::Unrouted)
    }

    /// Handle on a machine that is currently routed.
    pub fn routed(machine: Arc<dyn Machine>) -> Self {
        Self::with_route(machine, RouteState::Routed)
    }

    fn with_route(machine: Arc<dyn Machine>, state: RouteState) -> Self {
        Self {
            machine,
            route: Arc::new(Mutex::new(state)),
        }
    }

    pub fn machine(&self) -> &dyn Machine {
        self.machine.as_ref()
    }

    pub fn name(&self) -> &str {
        self.machine.name()
    }

    pub fn address(&self) -> String {
        self.machine.address()
    }

    pub fn route_state(&self) -> RouteState {
        *self.route.lock()
    }

    pub fn is_routable(&self) -> bool {
        self.route_state() == RouteState::Routed
    }

    pub fn mark_routed(&self) {
        *self.route.lock() = RouteState::Routed;
    }

    pub fn mark_unrouted(&self) {
        *self.route.lock() = RouteState::Unrouted;
    }

    /// Routed -> Released. Returns whether the machine was routed.
    pub fn release_route(&self) -> bool {
        let mut state = self.route.lock();
        if *state == RouteState::Routed {
            *state = RouteState::Released;
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for MachineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineHandle")
            .field("name", &self.name())
            .field("route", &self.route_state())
            .finish()
    }
}
