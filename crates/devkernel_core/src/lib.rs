//! Core of the devkernel IDE extensibility kernel.
//! This crate is the single source of truth for workspace, editor and plugin invariants.

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod extension;
pub mod kernel;
pub mod logging;
pub mod model;
pub mod service;
pub mod task;

pub use command::{Command, CommandArgs, CommandOutcome, KeyChord, Keybinding};
pub use config::{KernelConfig, PerformanceThresholds};
pub use error::{ErrorKind, KernelError, KernelResult};
pub use event::{EventBus, KernelEvent, ListenerId};
pub use extension::{Plugin, PluginInfo, PluginManifest, PluginStatus};
pub use kernel::{Kernel, KernelContext};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::file::{File, Folder};
pub use model::ids::{EditorId, ParticipantId, SessionId, TerminalId};
pub use task::CancellationFlag;

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
