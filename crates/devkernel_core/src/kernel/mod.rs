//! Kernel facade.
//!
//! # Responsibility
//! - Own the [`KernelContext`] and expose the host-facing lifecycle.
//! - Load default commands, default keybindings and built-in plugins on
//!   `initialize`; tear all of it down on `shutdown`.
//!
//! # Invariants
//! - `initialize` succeeds once per lifecycle; `shutdown` requires a prior
//!   successful `initialize`.
//! - A failed `initialize` leaves the kernel uninitialized and empty.

mod context;
mod defaults;

pub use context::KernelContext;

use crate::command::{Command, CommandArgs, CommandOutcome, KeyChord, Keybinding};
use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::event::{KernelEvent, ListenerId, ListenerResult};
use crate::extension::builtin::{register_catalog, BUILTIN_PLUGINS};
use crate::extension::PluginInfo;
use crate::model::ids::EditorId;
use log::{info, warn};

pub struct Kernel {
    ctx: KernelContext,
    initialized: bool,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    /// Kernel with default configuration. The plugin catalog is populated; nothing is loaded.
    pub fn new() -> Self {
        Self::build(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> KernelResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: KernelConfig) -> Self {
        let mut ctx = KernelContext::new(config);
        register_catalog(&mut ctx.plugins);
        Self {
            ctx,
            initialized: false,
        }
    }

    pub fn initialize(&mut self) -> KernelResult<()> {
        if self.initialized {
            return Err(KernelError::AlreadyInitialized);
        }
        if let Err(err) = self.load() {
            warn!(
                "event=kernel_initialize module=kernel status=error kind={}",
                err.kind().as_str()
            );
            self.ctx.shutdown_plugins();
            self.ctx.reset();
            return Err(err);
        }

        self.initialized = true;
        info!(
            "event=kernel_initialize module=kernel status=ok commands={} keybindings={} plugins={}",
            self.ctx.commands.len(),
            self.ctx.keybindings.len(),
            self.ctx.plugins.list().len()
        );
        self.ctx.bus.emit(KernelEvent::KernelInitialized);
        self.ctx.route_events();
        Ok(())
    }

    fn load(&mut self) -> KernelResult<()> {
        defaults::register_default_commands(&mut self.ctx.commands)?;
        self.ctx.keybindings.register_defaults()?;
        if self.ctx.config.builtin_plugins {
            for id in BUILTIN_PLUGINS {
                self.ctx.install_plugin(id)?;
                self.ctx.enable_plugin(id)?;
            }
        }
        Ok(())
    }

    /// Deactivates plugins, clears registries, managers and listeners.
    pub fn shutdown(&mut self) -> KernelResult<()> {
        if !self.initialized {
            return Err(KernelError::NotInitialized);
        }
        self.ctx.shutdown_plugins();
        self.ctx.bus.emit(KernelEvent::KernelShutdown);
        self.ctx.reset();
        self.initialized = false;
        info!("event=kernel_shutdown module=kernel status=ok");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &KernelConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &KernelContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut KernelContext {
        &mut self.ctx
    }

    /// Runs `f` against the context, then routes the events it produced.
    pub fn with_context<T>(&mut self, f: impl FnOnce(&mut KernelContext) -> T) -> T {
        let value = f(&mut self.ctx);
        self.ctx.route_events();
        value
    }

    pub fn execute_command(&mut self, id: &str, args: CommandArgs) -> CommandOutcome {
        self.ctx.execute_command(id, &args)
    }

    /// Registers or replaces a command. Returns `true` when an existing id was replaced.
    pub fn register_command(&mut self, command: Command) -> KernelResult<bool> {
        let result = self.ctx.commands.register(command);
        self.ctx.settle("registerCommand", result)
    }

    /// Binds `key` to `command`. A malformed chord is reported as a diagnostic.
    pub fn register_keybinding(&mut self, key: &str, command: &str) -> KernelResult<()> {
        let result = Keybinding::new(key, command)
            .map(|binding| self.ctx.keybindings.register(binding));
        self.ctx.settle("registerKeybinding", result)
    }

    /// Resolves a chord such as `Ctrl+S` and runs the bound command.
    ///
    /// `None` when the chord is malformed (reported as a diagnostic) or unbound.
    pub fn handle_key(&mut self, key: &str) -> Option<CommandOutcome> {
        let chord = match KeyChord::parse(key) {
            Ok(chord) => chord,
            Err(err) => {
                self.ctx.report("handleKey", &err);
                return None;
            }
        };
        let command = self.ctx.keybindings.resolve(&chord, &self.ctx)?;
        Some(self.ctx.execute_command(&command, &CommandArgs::Null))
    }

    pub fn open_file(&mut self, path: &str) -> KernelResult<EditorId> {
        let result = self.ctx.open_file(path);
        self.ctx.settle("openFile", result)
    }

    pub fn close_file(&mut self, path: &str) -> KernelResult<()> {
        let result = self.ctx.close_file(path);
        self.ctx.settle("closeFile", result)
    }

    pub fn get_plugin(&self, id: &str) -> Option<PluginInfo> {
        self.ctx.plugins.get(id)
    }

    pub fn install_plugin(&mut self, id: &str) -> KernelResult<PluginInfo> {
        self.ctx.install_plugin(id)
    }

    pub fn uninstall_plugin(&mut self, id: &str) -> KernelResult<()> {
        self.ctx.uninstall_plugin(id)
    }

    pub fn enable_plugin(&mut self, id: &str) -> KernelResult<()> {
        self.ctx.enable_plugin(id)
    }

    pub fn disable_plugin(&mut self, id: &str) -> KernelResult<()> {
        self.ctx.disable_plugin(id)
    }

    pub fn update_plugin(&mut self, id: &str) -> KernelResult<bool> {
        self.ctx.update_plugin(id)
    }

    /// Completes queued manager work; returns how many items finished.
    pub fn run_pending(&mut self) -> usize {
        self.ctx.run_pending()
    }

    pub fn on<F>(&self, event_name: &str, listener: F) -> ListenerId
    where
        F: FnMut(&KernelEvent) -> ListenerResult + 'static,
    {
        self.ctx.bus.on(event_name, listener)
    }

    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&KernelEvent) -> ListenerResult + 'static,
    {
        self.ctx.bus.on_any(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.ctx.bus.off(id)
    }
}
