//! # carton-parser
//!
//! Classification of inbound lifecycle requests.
//!
//! ## Overview
//!
//! - [`Category`] -- the closed set of request categories, each carrying its
//!   own action table and advertised allow-list.
//! - [`OperationKind`] / [`Operation`] -- the operation taxonomy a request
//!   resolves to.
//! - [`RequestParser`] -- two-level dispatch from `(category, action)` to an
//!   [`Operation`], failing with
//!   [`Error::Classification`](carton_core::Error::Classification) otherwise.
//!
//! Parsing is a pure function of its inputs: no I/O, no defaults.

pub mod category;
pub mod operation;
pub mod parser;

pub use category::Category;
pub use operation::{Operation, OperationKind};
pub use parser::{parse, parse_request, RequestParser};
