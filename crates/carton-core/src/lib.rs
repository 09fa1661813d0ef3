//! carton-core: shared types, IDs, errors, and the event bus.
//!
//! This crate is the foundational dependency for the other carton crates,
//! providing type-safe identifiers, a unified error type, the inbound
//! [`Request`] record, the provisioned unit description ([`BoxSpec`]), and a
//! broadcast event bus.

pub mod error;
pub mod events;
pub mod ids;
pub mod request;
pub mod unit;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use request::{ApiRequests, Request};
pub use unit::{BoxCompute, BoxSpec, MachineStatus};
