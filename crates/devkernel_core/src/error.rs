//! Kernel error taxonomy.
//!
//! # Responsibility
//! - Provide one error type shared by every manager and the kernel facade.
//! - Expose stable kind ids for diagnostic event payloads.
//!
//! # Invariants
//! - An operation that returns `Err` has not mutated any manager state.
//! - `ErrorKind::as_str` values are part of the diagnostic wire contract.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type KernelResult<T> = Result<T, KernelError>;

/// Coarse failure category reported in `kernel:diagnostic` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    State,
    Dependency,
    Conflict,
    Activation,
    Lifecycle,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::Dependency => "dependency",
            Self::Conflict => "conflict",
            Self::Activation => "activation",
            Self::Lifecycle => "lifecycle",
        }
    }
}

/// Errors returned by kernel operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Unknown id, missing entity or malformed input.
    Validation(String),
    /// Operation is not valid for the entity's current state.
    State {
        operation: &'static str,
        state: String,
    },
    /// Plugin dependency is missing/inactive, or active dependents block removal.
    Dependency {
        plugin_id: String,
        dependency: String,
    },
    /// Key already taken (path, breakpoint, plugin id).
    Conflict(String),
    /// Plugin `activate` returned an error.
    Activation { plugin_id: String, message: String },
    /// `initialize` called twice without `shutdown`.
    AlreadyInitialized,
    /// Operation requires an initialized kernel.
    NotInitialized,
}

impl KernelError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn state(operation: &'static str, state: impl Into<String>) -> Self {
        Self::State {
            operation,
            state: state.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::State { .. } => ErrorKind::State,
            Self::Dependency { .. } => ErrorKind::Dependency,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Activation { .. } => ErrorKind::Activation,
            Self::AlreadyInitialized | Self::NotInitialized => ErrorKind::Lifecycle,
        }
    }
}

impl Display for KernelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::State { operation, state } => {
                write!(f, "`{operation}` is not valid while {state}")
            }
            Self::Dependency {
                plugin_id,
                dependency,
            } => write!(
                f,
                "plugin `{plugin_id}` blocked by dependency `{dependency}`"
            ),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Activation { plugin_id, message } => {
                write!(f, "plugin `{plugin_id}` failed to activate: {message}")
            }
            Self::AlreadyInitialized => write!(f, "kernel is already initialized"),
            Self::NotInitialized => write!(f, "kernel is not initialized"),
        }
    }
}

impl Error for KernelError {}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, KernelError};

    #[test]
    fn kinds_map_to_stable_ids() {
        assert_eq!(
            KernelError::validation("missing").kind().as_str(),
            "validation"
        );
        assert_eq!(KernelError::state("stepOver", "idle").kind(), ErrorKind::State);
        assert_eq!(KernelError::AlreadyInitialized.kind().as_str(), "lifecycle");
    }

    #[test]
    fn display_names_operation_and_state() {
        let err = KernelError::state("startDebugging", "running");
        assert_eq!(err.to_string(), "`startDebugging` is not valid while running");
    }
}
