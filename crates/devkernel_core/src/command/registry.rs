//! Named command registry.
//!
//! # Responsibility
//! - Own the id -> command mapping used by the palette, keybindings and plugins.
//!
//! # Invariants
//! - At most one command per id; re-registering an id replaces the handler.
//! - A replaced command is shadowed, not dropped: removing a plugin's
//!   contributions brings back whatever that plugin had replaced.
//! - Registry mutations emit `command:registered` / `command:unregistered`.

use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::kernel::KernelContext;
use log::debug;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Arguments passed to a command handler (JSON so hosts can forward them as-is).
pub type CommandArgs = serde_json::Value;

/// Decodes handler arguments; `null` decodes like `{}`.
pub fn parse_args<T: DeserializeOwned>(args: &CommandArgs) -> KernelResult<T> {
    let value = if args.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        args.clone()
    };
    serde_json::from_value(value)
        .map_err(|err| KernelError::validation(format!("invalid command arguments: {err}")))
}

/// Command body; receives the whole kernel context.
pub type CommandHandler = Rc<dyn Fn(&mut KernelContext, &CommandArgs) -> KernelResult<()>>;

/// Predicate evaluated before running a command or resolving a keybinding.
pub type CommandGuard = Rc<dyn Fn(&KernelContext) -> bool>;

/// One invokable action.
#[derive(Clone)]
pub struct Command {
    pub id: String,
    pub title: String,
    pub category: String,
    /// Plugin that contributed the command, `None` for kernel defaults.
    pub source: Option<String>,
    handler: CommandHandler,
    guard: Option<CommandGuard>,
}

impl Command {
    pub fn new<F>(
        id: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(&mut KernelContext, &CommandArgs) -> KernelResult<()> + 'static,
    {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            source: None,
            handler: Rc::new(handler),
            guard: None,
        }
    }

    /// Attaches a `when` predicate.
    pub fn with_guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&KernelContext) -> bool + 'static,
    {
        self.guard = Some(Rc::new(guard));
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_enabled(&self, ctx: &KernelContext) -> bool {
        self.guard.as_ref().map_or(true, |guard| guard(ctx))
    }

    pub(crate) fn handler(&self) -> CommandHandler {
        Rc::clone(&self.handler)
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("category", &self.category)
            .field("source", &self.source)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Result of executing a command through the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Executed,
    /// No command with that id; a diagnostic event was emitted.
    NotFound,
    /// The guard predicate rejected execution.
    Blocked,
    /// The handler returned an error; a diagnostic event was emitted.
    Failed(KernelError),
}

impl CommandOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed)
    }
}

/// Id -> command registry.
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
    /// Replaced registrations per id, oldest first.
    shadowed: BTreeMap<String, Vec<Command>>,
    bus: EventBus,
}

impl CommandRegistry {
    pub fn new(bus: EventBus) -> Self {
        Self {
            commands: BTreeMap::new(),
            shadowed: BTreeMap::new(),
            bus,
        }
    }

    /// Registers or replaces a command. Returns `true` when an entry was replaced.
    pub fn register(&mut self, command: Command) -> KernelResult<bool> {
        let id = command.id.trim().to_string();
        if id.is_empty() {
            return Err(KernelError::validation("command id must not be empty"));
        }

        let previous = self.commands.insert(id.clone(), command);
        let replaced = previous.is_some();
        if let Some(previous) = previous {
            self.shadowed.entry(id.clone()).or_default().push(previous);
        }
        debug!(
            "event=command_registered module=command id={} replaced={}",
            id, replaced
        );
        self.bus
            .emit(KernelEvent::CommandRegistered { command_id: id });
        Ok(replaced)
    }

    /// Removes the id entirely, shadowed registrations included.
    pub fn unregister(&mut self, id: &str) -> Option<Command> {
        self.shadowed.remove(id.trim());
        let removed = self.commands.remove(id.trim())?;
        self.bus.emit(KernelEvent::CommandUnregistered {
            command_id: removed.id.clone(),
        });
        Some(removed)
    }

    /// Removes every command contributed by `source`; returns removed ids.
    ///
    /// Where the removed command had replaced an earlier registration, the
    /// newest remaining one is restored under the same id.
    pub fn unregister_by_source(&mut self, source: &str) -> Vec<String> {
        let from_source = |command: &Command| command.source.as_deref() == Some(source);
        for stack in self.shadowed.values_mut() {
            stack.retain(|command| !from_source(command));
        }
        self.shadowed.retain(|_, stack| !stack.is_empty());

        let ids: Vec<String> = self
            .commands
            .values()
            .filter(|command| from_source(command))
            .map(|command| command.id.clone())
            .collect();
        for id in &ids {
            let Some(removed) = self.commands.remove(id) else {
                continue;
            };
            let restored = self.shadowed.get_mut(id).and_then(Vec::pop);
            if self.shadowed.get(id).is_some_and(Vec::is_empty) {
                self.shadowed.remove(id);
            }
            match restored {
                Some(previous) => {
                    debug!(
                        "event=command_restored module=command id={} source={}",
                        id, source
                    );
                    self.commands.insert(id.clone(), previous);
                    self.bus.emit(KernelEvent::CommandRegistered {
                        command_id: id.clone(),
                    });
                }
                None => {
                    self.bus.emit(KernelEvent::CommandUnregistered {
                        command_id: removed.id,
                    });
                }
            }
        }
        ids
    }

    pub fn get(&self, id: &str) -> Option<&Command> {
        self.commands.get(id.trim())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.commands.contains_key(id.trim())
    }

    /// Commands sorted by id.
    pub fn list(&self) -> Vec<&Command> {
        self.commands.values().collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Command> {
        self.commands
            .values()
            .filter(|command| command.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.commands.clear();
        self.shadowed.clear();
    }
}
