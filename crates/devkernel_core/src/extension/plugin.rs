//! Plugin contract.

use crate::command::{Command, Keybinding};
use crate::error::{KernelError, KernelResult};
use crate::extension::manifest::PluginManifest;
use std::rc::Rc;

/// Collects what a plugin contributes while it activates.
///
/// Nothing reaches the registries unless `activate` returns `Ok`.
#[derive(Debug)]
pub struct ActivationContext {
    plugin_id: String,
    commands: Vec<Command>,
    keybindings: Vec<Keybinding>,
}

impl ActivationContext {
    pub(crate) fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            commands: Vec::new(),
            keybindings: Vec::new(),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn register_command(&mut self, command: Command) -> KernelResult<()> {
        if command.id.trim().is_empty() {
            return Err(KernelError::validation("command id must not be empty"));
        }
        self.commands.push(command.with_source(self.plugin_id.clone()));
        Ok(())
    }

    pub fn register_keybinding(&mut self, key: &str, command: &str) -> KernelResult<()> {
        let binding = Keybinding::new(key, command)?.with_source(self.plugin_id.clone());
        self.keybindings.push(binding);
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Vec<Command>, Vec<Keybinding>) {
        (self.commands, self.keybindings)
    }
}

/// In-process plugin.
pub trait Plugin {
    fn manifest(&self) -> &PluginManifest;

    /// Called once per enable.
    fn activate(&mut self, ctx: &mut ActivationContext) -> Result<(), String>;

    /// Called once per disable; contributions are removed by the kernel.
    fn deactivate(&mut self) {}
}

/// Builds a fresh plugin instance for install/update.
pub type PluginFactory = Rc<dyn Fn() -> Box<dyn Plugin>>;
