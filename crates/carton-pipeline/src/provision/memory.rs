//! In-memory provisioner that records every collaborator call.
//!
//! Failures can be injected per call kind; an injected failure still records
//! the attempted call.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use carton_core::{BoxSpec, Error, MachineStatus, Result};
use parking_lot::Mutex;

use super::{CreateArgs, Machine, MachineCommand, MachineHandle, Provisioner, Router};
use crate::context::ProgressWriter;

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve { name: String },
    Create { name: String, image: String },
    Remove { name: String },
    Logs { name: String },
    SetStatus { name: String, status: MachineStatus },
    Command { name: String, command: MachineCommand },
    AddRoute { provider: String, name: String, address: String },
    RemoveRoute { provider: String, name: String, address: String },
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::Resolve { .. } => CallKind::Resolve,
            Self::Create { .. } => CallKind::Create,
            Self::Remove { .. } => CallKind::Remove,
            Self::Logs { .. } => CallKind::Logs,
            Self::SetStatus { .. } => CallKind::SetStatus,
            Self::Command { .. } => CallKind::Command,
            Self::AddRoute { .. } => CallKind::AddRoute,
            Self::RemoveRoute { .. } => CallKind::RemoveRoute,
        }
    }
}

/// Call kinds failures can be injected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Resolve,
    Create,
    Remove,
    Logs,
    SetStatus,
    Command,
    AddRoute,
    RemoveRoute,
    /// [`Provisioner::router_for`]; not recorded as a call.
    RouterLookup,
}

#[derive(Debug, Default)]
struct MachineRecord {
    address: String,
    exists: bool,
    status: Option<MachineStatus>,
}

#[derive(Debug, Default)]
struct Ledger {
    calls: Vec<Call>,
    failures: HashMap<CallKind, String>,
    /// provider -> route name -> address
    routes: HashMap<String, BTreeMap<String, String>>,
    machines: HashMap<String, MachineRecord>,
    log_lines: HashMap<String, Vec<String>>,
    next_host: u32,
}

impl Ledger {
    /// Record `call` and return the injected failure for its kind, if any.
    fn attempt(&mut self, call: Call) -> Option<String> {
        let kind = call.kind();
        self.calls.push(call);
        self.failures.get(&kind).cloned()
    }

    fn record(&mut self, name: &str) -> &mut MachineRecord {
        let next_host = &mut self.next_host;
        self.machines.entry(name.to_string()).or_insert_with(|| {
            *next_host += 1;
            MachineRecord {
                address: format!("10.0.0.{next_host}:8080"),
                ..Default::default()
            }
        })
    }
}

/// Recording [`Provisioner`] backed by shared in-memory state.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvisioner {
    ledger: Arc<Mutex<Ledger>>,
}

impl MemoryProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `kind` fail with `message`.
    pub fn fail_on(&self, kind: CallKind, message: impl Into<String>) {
        self.ledger.lock().failures.insert(kind, message.into());
    }

    pub fn clear_failure(&self, kind: CallKind) {
        self.ledger.lock().failures.remove(&kind);
    }

    /// Pre-existing machine, optionally routed through `provider`.
    pub fn seed_machine(&self, unit: &BoxSpec, routed: bool) {
        let mut ledger = self.ledger.lock();
        let record = ledger.record(&unit.name);
        record.exists = true;
        let address = record.address.clone();
        if routed {
            ledger
                .routes
                .entry(unit.provider.clone())
                .or_default()
                .insert(unit.name.clone(), address);
        }
    }

    /// Lines [`Machine::logs`] writes for `name`.
    pub fn set_log_lines(&self, name: &str, lines: &[&str]) {
        self.ledger.lock().log_lines.insert(
            name.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.ledger.lock().calls.clone()
    }

    /// Number of recorded calls of `kind`.
    pub fn count(&self, kind: CallKind) -> usize {
        self.ledger
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    pub fn has_route(&self, provider: &str, name: &str) -> bool {
        self.ledger
            .lock()
            .routes
            .get(provider)
            .is_some_and(|r| r.contains_key(name))
    }

    pub fn machine_exists(&self, name: &str) -> bool {
        self.ledger
            .lock()
            .machines
            .get(name)
            .is_some_and(|m| m.exists)
    }

    /// Last status successfully recorded for `name`.
    pub fn status(&self, name: &str) -> Option<MachineStatus> {
        self.ledger.lock().machines.get(name).and_then(|m| m.status)
    }

    /// Every status set attempted for `name`, in order.
    pub fn statuses(&self, name: &str) -> Vec<MachineStatus> {
        self.ledger
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetStatus { name: n, status } if n == name => Some(*status),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Provisioner for MemoryProvisioner {
    async fn machine_for(&self, unit: &BoxSpec) -> Result<MachineHandle> {
        let mut ledger = self.ledger.lock();
        if let Some(message) = ledger.attempt(Call::Resolve {
            name: unit.name.clone(),
        }) {
            tracing::debug!("Injected resolve failure for {}: {message}", unit.name);
            return Err(Error::not_found("machine", &unit.name));
        }

        let address = ledger.record(&unit.name).address.clone();
        let routed = ledger
            .routes
            .get(&unit.provider)
            .is_some_and(|r| r.contains_key(&unit.name));
        drop(ledger);

        let machine: Arc<dyn Machine> = Arc::new(MemoryMachine {
            name: unit.name.clone(),
            address,
            ledger: Arc::clone(&self.ledger),
        });
        Ok(if routed {
            MachineHandle::routed(machine)
        } else {
            MachineHandle::new(machine)
        })
    }

    fn router_for(&self, provider: &str) -> Result<Arc<dyn Router>> {
        let ledger = self.ledger.lock();
        if provider.is_empty() || ledger.failures.contains_key(&CallKind::RouterLookup) {
            return Err(Error::not_found("router", provider));
        }
        Ok(Arc::new(MemoryRouter {
            provider: provider.to_string(),
            ledger: Arc::clone(&self.ledger),
        }))
    }
}

// ---------------------------------------------------------------------------
// MemoryMachine
// ---------------------------------------------------------------------------

struct MemoryMachine {
    name: String,
    address: String,
    ledger: Arc<Mutex<Ledger>>,
}

impl MemoryMachine {
    fn attempt(&self, call: Call) -> Result<()> {
        match self.ledger.lock().attempt(call) {
            Some(message) => Err(Error::machine(&self.name, message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Machine for MemoryMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> String {
        self.address.clone()
    }

    async fn create(&self, args: &CreateArgs) -> Result<()> {
        self.attempt(Call::Create {
            name: self.name.clone(),
            image: args.image.clone(),
        })?;
        self.ledger.lock().record(&self.name).exists = true;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.attempt(Call::Remove {
            name: self.name.clone(),
        })?;
        self.ledger.lock().record(&self.name).exists = false;
        Ok(())
    }

    async fn logs(&self, out: &ProgressWriter) -> Result<()> {
        self.attempt(Call::Logs {
            name: self.name.clone(),
        })?;
        let lines = self
            .ledger
            .lock()
            .log_lines
            .get(&self.name)
            .cloned()
            .unwrap_or_else(|| vec![format!("{} | booted", self.name)]);
        for line in lines {
            out.write_str(&format!("{line}\n"));
        }
        Ok(())
    }

    async fn set_status(&self, status: MachineStatus) -> Result<()> {
        self.attempt(Call::SetStatus {
            name: self.name.clone(),
            status,
        })?;
        self.ledger.lock().record(&self.name).status = Some(status);
        Ok(())
    }

    async fn command(&self, command: MachineCommand) -> Result<()> {
        self.attempt(Call::Command {
            name: self.name.clone(),
            command,
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryRouter
// ---------------------------------------------------------------------------

struct MemoryRouter {
    provider: String,
    ledger: Arc<Mutex<Ledger>>,
}

#[async_trait]
impl Router for MemoryRouter {
    async fn add_route(&self, name: &str, address: &str) -> Result<()> {
        let mut ledger = self.ledger.lock();
        if let Some(message) = ledger.attempt(Call::AddRoute {
            provider: self.provider.clone(),
            name: name.to_string(),
            address: address.to_string(),
        }) {
            return Err(Error::router(&self.provider, message));
        }
        ledger
            .routes
            .entry(self.provider.clone())
            .or_default()
            .insert(name.to_string(), address.to_string());
        Ok(())
    }

    async fn remove_route(&self, name: &str, address: &str) -> Result<()> {
        let mut ledger = self.ledger.lock();
        if let Some(message) = ledger.attempt(Call::RemoveRoute {
            provider: self.provider.clone(),
            name: name.to_string(),
            address: address.to_string(),
        }) {
            return Err(Error::router(&self.provider, message));
        }
        if let Some(routes) = ledger.routes.get_mut(&self.provider) {
            routes.remove(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SharedBuffer;

    #[tokio::test]
    async fn resolve_reflects_seeded_route() {
        let provisioner = MemoryProvisioner::new();
        let unit = BoxSpec::new("web", "one");
        provisioner.seed_machine(&unit, true);

        let handle = provisioner.machine_for(&unit).await.unwrap();
        assert!(handle.is_routable());
        assert_eq!(handle.address(), "10.0.0.1:8080");
        assert!(provisioner.machine_exists("web"));
        assert!(provisioner.has_route("one", "web"));
    }

    #[tokio::test]
    async fn injected_failure_records_attempt() {
        let provisioner = MemoryProvisioner::new();
        provisioner.fail_on(CallKind::Create, "quota exceeded");

        let handle = provisioner
            .machine_for(&BoxSpec::new("web", "one"))
            .await
            .unwrap();
        let args = CreateArgs {
            name: "web".into(),
            image: "debian-12".into(),
            compute: Default::default(),
            provider: "one".into(),
        };
        let err = handle.machine().create(&args).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(provisioner.count(CallKind::Create), 1);
        assert!(!provisioner.machine_exists("web"));

        provisioner.clear_failure(CallKind::Create);
        handle.machine().create(&args).await.unwrap();
        assert!(provisioner.machine_exists("web"));
    }

    #[tokio::test]
    async fn router_tracks_routes() {
        let provisioner = MemoryProvisioner::new();
        let router = provisioner.router_for("one").unwrap();
        router.add_route("web", "10.0.0.9:8080").await.unwrap();
        assert!(provisioner.has_route("one", "web"));
        router.remove_route("web", "10.0.0.9:8080").await.unwrap();
        assert!(!provisioner.has_route("one", "web"));
        assert!(provisioner.router_for("").is_err());
    }

    #[tokio::test]
    async fn logs_stream_into_progress() {
        let provisioner = MemoryProvisioner::new();
        provisioner.set_log_lines("web", &["starting", "listening on :8080"]);
        let handle = provisioner
            .machine_for(&BoxSpec::new("web", "one"))
            .await
            .unwrap();

        let buf = SharedBuffer::new();
        handle
            .machine()
            .logs(&ProgressWriter::new(buf.clone()))
            .await
            .unwrap();
        assert_eq!(buf.contents(), "starting\nlistening on :8080\n");
    }
}
