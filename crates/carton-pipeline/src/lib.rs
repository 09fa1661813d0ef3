//! # carton-pipeline
//!
//! Compensating pipelines that turn a classified operation into concrete
//! infrastructure changes.
//!
//! This crate provides:
//!
//! - **[`Action`]** trait -- a named, reversible step with forward /
//!   backward / on-error semantics.
//! - **[`ActionContext`]** -- run-scoped parameters, progress writer,
//!   diagnostics sink and the provisioner the actions talk to.
//! - **Built-in actions** ([`actions`]) -- status update, machine creation
//!   and removal, route add/remove, log streaming, lifecycle commands.
//! - **[`PipelineExecutor`]** -- runs actions in order and, when a step
//!   fails, compensates every completed step in reverse.
//! - **[`plan_for`]** -- maps each [`Operation`](carton_parser::Operation)
//!   to its action sequence.
//! - **[`provision`]** -- the `Machine` / `Router` / `Provisioner`
//!   collaborator traits plus an in-memory implementation.

pub mod action;
pub mod actions;
pub mod context;
pub mod executor;
pub mod factory;
pub mod provision;

// Re-export key types at the crate root.
pub use action::{Action, ActionResult, OutputKind, StepOutput};
pub use context::{
    ActionContext, DiagnosticKind, DiagnosticRecord, Diagnostics, Param, Params, ProgressWriter,
    SharedBuffer,
};
pub use executor::{PipelineExecutor, PipelineReport, PipelineState, StepRecord};
pub use factory::{build_pipeline, plan_for};
pub use provision::{
    CreateArgs, Machine, MachineCommand, MachineHandle, Provisioner, RouteState, Router,
};
