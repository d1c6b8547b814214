//! Shared state handed to command handlers.
//!
//! # Responsibility
//! - Own every manager and both registries.
//! - Route bus events between managers after each operation.
//!
//! # Invariants
//! - Managers never call each other; cross-manager effects happen in
//!   [`KernelContext::route_events`] only.
//! - Failed UI-triggered operations become a `kernel:diagnostic` event plus
//!   a warning log line; they never panic.

use crate::command::{CommandArgs, CommandOutcome, CommandRegistry, KeybindingRegistry};
use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::extension::{Contributions, PluginInfo, PluginManager};
use crate::logging::sanitize;
use crate::model::file::normalize_path;
use crate::model::ids::EditorId;
use crate::model::language::language_for_path;
use crate::service::ai::AiManager;
use crate::service::collaboration::CollaborationManager;
use crate::service::debugger::DebuggerManager;
use crate::service::editor::EditorManager;
use crate::service::performance::PerformanceManager;
use crate::service::terminal::TerminalManager;
use crate::service::workspace::WorkspaceManager;
use log::{debug, warn};

pub struct KernelContext {
    pub config: KernelConfig,
    pub bus: EventBus,
    pub commands: CommandRegistry,
    pub keybindings: KeybindingRegistry,
    pub plugins: PluginManager,
    pub workspace: WorkspaceManager,
    pub editors: EditorManager,
    pub terminals: TerminalManager,
    pub debugger: DebuggerManager,
    pub ai: AiManager,
    pub collaboration: CollaborationManager,
    pub performance: PerformanceManager,
}

impl KernelContext {
    pub(crate) fn new(config: KernelConfig) -> Self {
        let bus = EventBus::new();
        Self {
            commands: CommandRegistry::new(bus.clone()),
            keybindings: KeybindingRegistry::new(bus.clone()),
            plugins: PluginManager::new(bus.clone()),
            workspace: WorkspaceManager::new(bus.clone()),
            editors: EditorManager::new(bus.clone()),
            terminals: TerminalManager::new(bus.clone(), &config),
            debugger: DebuggerManager::new(bus.clone()),
            ai: AiManager::new(bus.clone()),
            collaboration: CollaborationManager::new(bus.clone()),
            performance: PerformanceManager::new(bus.clone(), config.performance.clone()),
            config,
            bus,
        }
    }

    /// Runs a registered command. Handlers may call back into this method.
    pub fn execute_command(&mut self, id: &str, args: &CommandArgs) -> CommandOutcome {
        let Some(command) = self.commands.get(id).cloned() else {
            self.report(
                "executeCommand",
                &KernelError::validation(format!("unknown command: {id}")),
            );
            return CommandOutcome::NotFound;
        };
        if !command.is_enabled(self) {
            debug!("event=command_blocked module=command command_id={id}");
            return CommandOutcome::Blocked;
        }

        let handler = command.handler();
        let result = handler(self, args);
        self.route_events();
        match result {
            Ok(()) => {
                debug!("event=command_execute module=command status=ok command_id={id}");
                CommandOutcome::Executed
            }
            Err(err) => {
                self.report(id, &err);
                CommandOutcome::Failed(err)
            }
        }
    }

    /// Opens a workspace file and focuses an editor bound to it.
    ///
    /// An existing editor for the path is reused.
    pub fn open_file(&mut self, path: &str) -> KernelResult<EditorId> {
        let file = self.workspace.open_file(path)?;
        let id = match self.editors.editors_for_path(&file.path).first() {
            Some(&existing) => {
                self.editors.switch_editor(existing)?;
                existing
            }
            None => self.editors.create_editor(&file),
        };
        self.route_events();
        Ok(id)
    }

    /// Closes a workspace file together with its editors.
    pub fn close_file(&mut self, path: &str) -> KernelResult<()> {
        let path = normalize_path(path)?;
        self.workspace.close_file(&path)?;
        self.editors.close_for_path(&path);
        self.route_events();
        Ok(())
    }

    /// Applies queued cross-manager effects until the queue is empty.
    pub fn route_events(&mut self) {
        loop {
            let batch = self.bus.take_routed();
            if batch.is_empty() {
                break;
            }
            for event in &batch {
                self.route(event);
            }
        }
    }

    fn route(&mut self, event: &KernelEvent) {
        match event {
            KernelEvent::FileRenamed { old_path, new_path } => {
                self.editors
                    .retarget(old_path, new_path, language_for_path(new_path));
                self.debugger.retarget_breakpoints(old_path, new_path);
            }
            KernelEvent::FileDeleted { path } => self.editors.close_for_path(path),
            KernelEvent::FolderDeleted { removed_files, .. } => {
                for path in removed_files {
                    self.editors.close_for_path(path);
                }
            }
            KernelEvent::FileSaved { path, .. } => {
                if let Some(file) = self.workspace.file(path) {
                    self.editors.file_saved(file);
                }
            }
            KernelEvent::FileModified { path } => {
                if let Some(file) = self.workspace.file(path) {
                    self.editors.file_modified(file);
                }
            }
            KernelEvent::BreakpointAdded { file, line } => {
                self.editors.set_breakpoint_marker(file, *line, true);
            }
            KernelEvent::BreakpointRemoved { file, line } => {
                self.editors.set_breakpoint_marker(file, *line, false);
            }
            KernelEvent::EditorCreated { path, .. } => {
                let lines: Vec<u32> = self
                    .debugger
                    .breakpoints_in(path)
                    .iter()
                    .map(|breakpoint| breakpoint.line)
                    .collect();
                for line in lines {
                    self.editors.set_breakpoint_marker(path, line, true);
                }
            }
            _ => {}
        }
    }

    /// Emits a diagnostic and logs a warning for a degraded operation.
    pub(crate) fn report(&self, operation: &str, err: &KernelError) {
        let message = sanitize(&err.to_string());
        warn!(
            "event=operation_failed module=kernel status=error operation={} kind={} message={}",
            operation,
            err.kind().as_str(),
            message
        );
        self.bus.emit(KernelEvent::Diagnostic {
            operation: operation.to_string(),
            kind: err.kind().as_str().to_string(),
            message,
        });
    }

    pub fn install_plugin(&mut self, id: &str) -> KernelResult<PluginInfo> {
        let result = self.plugins.install(id);
        self.settle("installPlugin", result)
    }

    pub fn enable_plugin(&mut self, id: &str) -> KernelResult<()> {
        let result = self.plugins.enable(
            id,
            Contributions {
                commands: &mut self.commands,
                keybindings: &mut self.keybindings,
            },
        );
        self.settle("enablePlugin", result)
    }

    pub fn disable_plugin(&mut self, id: &str) -> KernelResult<()> {
        let result = self.plugins.disable(
            id,
            Contributions {
                commands: &mut self.commands,
                keybindings: &mut self.keybindings,
            },
        );
        self.settle("disablePlugin", result)
    }

    pub fn uninstall_plugin(&mut self, id: &str) -> KernelResult<()> {
        let result = self.plugins.uninstall(
            id,
            Contributions {
                commands: &mut self.commands,
                keybindings: &mut self.keybindings,
            },
        );
        self.settle("uninstallPlugin", result)
    }

    /// Replaces an installed plugin with the catalog version. `Ok(false)` when already current.
    pub fn update_plugin(&mut self, id: &str) -> KernelResult<bool> {
        let result = self.plugins.update(
            id,
            Contributions {
                commands: &mut self.commands,
                keybindings: &mut self.keybindings,
            },
        );
        self.settle("updatePlugin", result)
    }

    /// Completes queued terminal, debugger, chat and sampling work.
    pub fn run_pending(&mut self) -> usize {
        let completed = self.terminals.run_pending()
            + self.debugger.run_pending()
            + self.ai.run_pending()
            + self.performance.run_pending();
        for err in self.ai.take_failures() {
            self.report("sendMessage", &err);
        }
        self.route_events();
        completed
    }

    pub(crate) fn shutdown_plugins(&mut self) {
        self.plugins.shutdown(Contributions {
            commands: &mut self.commands,
            keybindings: &mut self.keybindings,
        });
    }

    /// Drops all session state without emitting events.
    pub(crate) fn reset(&mut self) {
        self.commands.clear();
        self.keybindings.clear();
        self.workspace.clear();
        self.editors.clear();
        self.terminals.clear();
        self.debugger.clear();
        self.ai.clear_history();
        self.collaboration.clear();
        self.performance.clear();
        self.bus.clear();
    }

    /// Reports a failed host-triggered operation, then routes pending events.
    pub(crate) fn settle<T>(&mut self, operation: &str, result: KernelResult<T>) -> KernelResult<T> {
        if let Err(err) = &result {
            self.report(operation, err);
        }
        self.route_events();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::KernelContext;
    use crate::command::{Command, CommandOutcome};
    use crate::config::KernelConfig;
    use crate::error::KernelError;
    use crate::event::KernelEvent;
    use crate::service::debugger::Breakpoint;
    use serde_json::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn context() -> KernelContext {
        KernelContext::new(KernelConfig::default())
    }

    fn diagnostics(ctx: &KernelContext) -> Rc<RefCell<Vec<KernelEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctx.bus.on("kernel:diagnostic", move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn unknown_command_reports_diagnostic() {
        let mut ctx = context();
        let seen = diagnostics(&ctx);

        let outcome = ctx.execute_command("missing.command", &Value::Null);

        assert_eq!(outcome, CommandOutcome::NotFound);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            &seen[0],
            KernelEvent::Diagnostic { operation, kind, .. }
                if operation == "executeCommand" && kind == "validation"
        ));
    }

    #[test]
    fn guarded_command_is_blocked_without_diagnostic() {
        let mut ctx = context();
        let seen = diagnostics(&ctx);
        ctx.commands
            .register(Command::new("x.guarded", "Guarded", "Test", |_, _| Ok(())).with_guard(|_| false))
            .expect("register guarded command");

        assert_eq!(ctx.execute_command("x.guarded", &Value::Null), CommandOutcome::Blocked);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn failing_handler_surfaces_error() {
        let mut ctx = context();
        let seen = diagnostics(&ctx);
        ctx.commands
            .register(Command::new("x.fail", "Fail", "Test", |_, _| {
                Err(KernelError::state("fail", "broken"))
            }))
            .expect("register failing command");

        let outcome = ctx.execute_command("x.fail", &Value::Null);

        assert!(matches!(outcome, CommandOutcome::Failed(KernelError::State { .. })));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn handlers_can_nest_commands() {
        let mut ctx = context();
        ctx.commands
            .register(Command::new("x.inner", "Inner", "Test", |ctx, _| {
                ctx.workspace.create_file("/inner.txt", "")?;
                Ok(())
            }))
            .expect("register inner");
        ctx.commands
            .register(Command::new("x.outer", "Outer", "Test", |ctx, args| {
                match ctx.execute_command("x.inner", args) {
                    CommandOutcome::Executed => Ok(()),
                    other => Err(KernelError::state("outer", format!("{other:?}"))),
                }
            }))
            .expect("register outer");

        assert!(ctx.execute_command("x.outer", &Value::Null).is_executed());
        assert!(ctx.workspace.file("/inner.txt").is_some());
    }

    #[test]
    fn open_file_reuses_existing_editor() {
        let mut ctx = context();
        ctx.workspace.create_file("/a.rs", "fn a() {}").expect("create file");

        let first = ctx.open_file("/a.rs").expect("open file");
        let second = ctx.open_file("a.rs").expect("reopen file");

        assert_eq!(first, second);
        assert_eq!(ctx.editors.len(), 1);
        assert_eq!(ctx.editors.active_id(), Some(first));
    }

    #[test]
    fn rename_retargets_editors_and_breakpoints() {
        let mut ctx = context();
        ctx.workspace.create_folder("/src").expect("create folder");
        ctx.workspace.create_file("/src/a.js", "let a = 1;").expect("create file");
        let editor = ctx.open_file("/src/a.js").expect("open file");
        ctx.debugger
            .add_breakpoint(Breakpoint::new("/src/a.js", 1))
            .expect("add breakpoint");
        ctx.route_events();
        assert!(ctx.editors.get(editor).expect("editor").breakpoints.contains(&1));

        ctx.workspace.rename_file("/src/a.js", "/src/a.ts").expect("rename file");
        ctx.route_events();

        let instance = ctx.editors.get(editor).expect("editor survives rename");
        assert_eq!(instance.path, "/src/a.ts");
        assert_eq!(instance.language, "typescript");
        assert_eq!(ctx.debugger.breakpoints_in("/src/a.ts").len(), 1);
        assert!(ctx.debugger.breakpoints_in("/src/a.js").is_empty());
    }

    #[test]
    fn deleting_a_file_closes_its_editors() {
        let mut ctx = context();
        ctx.workspace.create_file("/gone.md", "# gone").expect("create file");
        ctx.open_file("/gone.md").expect("open file");

        ctx.workspace.delete_file("/gone.md").expect("delete file");
        ctx.route_events();

        assert!(ctx.editors.is_empty());
    }

    #[test]
    fn save_clears_editor_dirty_flag() {
        let mut ctx = context();
        ctx.workspace.create_file("/notes.txt", "one").expect("create file");
        let editor = ctx.open_file("/notes.txt").expect("open file");
        ctx.editors.update_content(editor, "two").expect("edit");
        assert!(ctx.editors.get(editor).expect("editor").dirty);

        ctx.workspace.save_file("/notes.txt", "two").expect("save");
        ctx.route_events();

        let instance = ctx.editors.get(editor).expect("editor");
        assert!(!instance.dirty);
        assert_eq!(instance.content, "two");
    }

    #[test]
    fn new_editor_picks_up_existing_breakpoints() {
        let mut ctx = context();
        ctx.workspace.create_file("/main.py", "print(1)\nprint(2)").expect("create file");
        ctx.debugger
            .add_breakpoint(Breakpoint::new("/main.py", 2))
            .expect("add breakpoint");

        let editor = ctx.open_file("/main.py").expect("open file");

        assert!(ctx.editors.get(editor).expect("editor").breakpoints.contains(&2));
    }
}
