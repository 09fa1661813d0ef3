//! Provisioned unit descriptions: the box, its compute spec, and its status.
//!
//! Status enums serialize in snake_case and implement `Display` manually with
//! the literal strings written to the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default disk size (GB) when the assembly does not specify one.
pub const DEFAULT_HDD: &str = "10";

// ---------------------------------------------------------------------------
// BoxCompute
// ---------------------------------------------------------------------------

/// Compute shape requested for a box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxCompute {
    pub cpushare: String,
    pub memory: String,
    pub swap: String,
    pub hdd: String,
}

impl Default for BoxCompute {
    fn default() -> Self {
        Self {
            cpushare: String::new(),
            memory: String::new(),
            swap: String::new(),
            hdd: DEFAULT_HDD.into(),
        }
    }
}

impl fmt::Display for BoxCompute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cpu={} mem={} swap={} hdd={}",
            self.cpushare, self.memory, self.swap, self.hdd
        )
    }
}

// ---------------------------------------------------------------------------
// BoxSpec
// ---------------------------------------------------------------------------

/// A single provisioned compute unit belonging to a carton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSpec {
    /// Unit name; also the route name.
    pub name: String,
    #[serde(default)]
    pub carton_id: String,
    #[serde(default)]
    pub component_id: String,
    #[serde(default)]
    pub account_id: String,
    /// Provider used to resolve the unit's router.
    pub provider: String,
    /// Image the machine is created from.
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub compute: BoxCompute,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl BoxSpec {
    /// Create a box with the given name and provider and default compute.
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            carton_id: String::new(),
            component_id: String::new(),
            account_id: String::new(),
            provider: provider.into(),
            image: String::new(),
            compute: BoxCompute::default(),
            public_ip: None,
            region: None,
        }
    }

    /// Builder: set the image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Builder: set the compute spec.
    pub fn with_compute(mut self, compute: BoxCompute) -> Self {
        self.compute = compute;
        self
    }

    /// `carton_id/name`, or just `name` for boxes outside a carton.
    pub fn full_name(&self) -> String {
        if self.carton_id.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.carton_id, self.name)
        }
    }
}

// ---------------------------------------------------------------------------
// MachineStatus
// ---------------------------------------------------------------------------

/// Status recorded against a machine while it moves through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    BuildingImage,
    Bootstrapped,
    Running,
    Error,
    Destroyed,
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildingImage => write!(f, "building image"),
            Self::Bootstrapped => write!(f, "bootstrapped"),
            Self::Running => write!(f, "running"),
            Self::Error => write!(f, "error"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}
