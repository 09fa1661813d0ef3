//! Carton - control plane core for carton provisioning
//!
//! This library crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod processor;
