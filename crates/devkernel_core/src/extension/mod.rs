//! Plugin host.
//!
//! Manifests are validated at install time; plugins run in-process and
//! contribute commands and keybindings while active. Dynamic loading of
//! third-party code is out of scope.

pub mod builtin;
pub mod manager;
pub mod manifest;
pub mod plugin;

pub use manager::{Contributions, PluginInfo, PluginManager, PluginStatus};
pub use manifest::{ManifestValidationError, PluginManifest};
pub use plugin::{ActivationContext, Plugin, PluginFactory};
