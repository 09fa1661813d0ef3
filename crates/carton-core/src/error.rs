//! Unified error type for the carton control plane.
//!
//! Parse-time failures ([`Error::Classification`]) stop a request before any
//! side effect happens. Pipeline-time failures surface as [`Error::Forward`]
//! only after every completed step has been compensated.

use std::fmt;

/// Unified error type covering all failure modes in carton.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `(category, action)` pair is outside the allowed set.
    #[error("found {found}, expected {}", .expected.join(", "))]
    Classification {
        /// The literal pair that was received, joined as `"<category>,<action>"`.
        found: String,
        /// The allow-list for the scope that failed to match.
        expected: Vec<String>,
    },

    /// A pipeline was assembled incorrectly (programming defect).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A pipeline step's forward effect failed. Completed steps have already
    /// been compensated when this is returned.
    #[error("Pipeline step [{step}] failed: {source}")]
    Forward {
        /// Name of the failing step.
        step: String,
        /// The error raised by the step.
        source: Box<Error>,
    },

    /// A compensation (backward) call failed. Reported, never propagated.
    #[error("Compensation error [{step}]: {message}")]
    Compensation {
        /// Name of the step whose backward call failed.
        step: String,
        /// Human-readable error description.
        message: String,
    },

    /// The machine collaborator returned an error.
    #[error("Machine error [{name}]: {message}")]
    Machine {
        /// Name of the machine.
        name: String,
        /// Human-readable error description.
        message: String,
    },

    /// The router collaborator returned an error.
    #[error("Router error [{provider}]: {message}")]
    Router {
        /// Provider the router was resolved for.
        provider: String,
        /// Human-readable error description.
        message: String,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "machine", "router").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::Classification`].
    pub fn classification<S: AsRef<str>>(found: &[&str], expected: &[S]) -> Self {
        Error::Classification {
            found: found.join(","),
            expected: expected.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Convenience constructor for [`Error::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Wrap a step failure with the step's name.
    pub fn forward(step: impl Into<String>, source: Error) -> Self {
        Error::Forward {
            step: step.into(),
            source: Box::new(source),
        }
    }

    /// Convenience constructor for [`Error::Compensation`].
    pub fn compensation(step: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Compensation {
            step: step.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Machine`].
    pub fn machine(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Machine {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Router`].
    pub fn router(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Router {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Name of the failing step, if this is a [`Error::Forward`].
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Error::Forward { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Whether re-submitting the same request could succeed.
    ///
    /// Classification and configuration errors are deterministic and never
    /// retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Classification { .. } | Error::Configuration(_) | Error::Validation(_) => false,
            Error::Forward { source, .. } => source.is_retryable(),
            Error::Machine { .. } | Error::Router { .. } | Error::Io { .. } => true,
            Error::Compensation { .. } | Error::NotFound { .. } | Error::Internal(_) => false,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
