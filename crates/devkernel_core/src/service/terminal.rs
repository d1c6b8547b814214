//! Terminal manager.
//!
//! # Responsibility
//! - Own terminal entities (history, output log, running flag).
//! - Queue command executions and complete them when pending work runs.
//!
//! # Invariants
//! - At most one in-flight command per terminal; a second submission is rejected.
//! - `terminal:output` / `terminal:aborted` are emitted only from `run_pending`
//!   or `cancel`, never from inside `execute_command`.

use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::model::ids::TerminalId;
use crate::task::CancellationFlag;
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

const INTERRUPT_LINE: &str = "^C";

/// Result of running one command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellOutput {
    pub lines: Vec<String>,
    pub exit_code: i32,
    /// New working directory, when the command changed it.
    pub cwd: Option<String>,
    /// Clear the output log instead of appending.
    pub clear: bool,
}

/// Command execution backend.
pub trait ShellBackend {
    fn run(&mut self, cwd: &str, command: &str) -> ShellOutput;
}

/// Built-in backend understanding `echo`, `pwd`, `cd` and `clear`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoShell;

impl ShellBackend for EchoShell {
    fn run(&mut self, cwd: &str, command: &str) -> ShellOutput {
        let command = command.trim();
        let (program, rest) = command
            .split_once(char::is_whitespace)
            .map(|(program, rest)| (program, rest.trim()))
            .unwrap_or((command, ""));

        match program {
            "echo" => ShellOutput {
                lines: vec![rest.to_string()],
                ..ShellOutput::default()
            },
            "pwd" => ShellOutput {
                lines: vec![cwd.to_string()],
                ..ShellOutput::default()
            },
            "cd" => ShellOutput {
                cwd: Some(resolve_dir(cwd, rest)),
                ..ShellOutput::default()
            },
            "clear" => ShellOutput {
                clear: true,
                ..ShellOutput::default()
            },
            _ => ShellOutput {
                lines: vec![format!("{program}: command executed")],
                ..ShellOutput::default()
            },
        }
    }
}

fn resolve_dir(cwd: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') || target.is_empty() {
        Vec::new()
    } else {
        cwd.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Terminal {
    pub id: TerminalId,
    pub name: String,
    pub cwd: String,
    pub history: VecDeque<String>,
    pub output: VecDeque<String>,
    pub running: bool,
}

/// Handle for one queued execution.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    pub terminal_id: TerminalId,
    pub command: String,
    flag: CancellationFlag,
}

impl ExecutionHandle {
    /// Token that aborts the execution if flipped before it completes.
    pub fn cancellation(&self) -> CancellationFlag {
        self.flag.clone()
    }
}

pub struct TerminalManager {
    terminals: BTreeMap<TerminalId, Terminal>,
    order: Vec<TerminalId>,
    active: Option<TerminalId>,
    pending: VecDeque<ExecutionHandle>,
    backend: Box<dyn ShellBackend>,
    created: usize,
    default_cwd: String,
    history_limit: usize,
    output_limit: usize,
    bus: EventBus,
}

impl TerminalManager {
    pub fn new(bus: EventBus, config: &KernelConfig) -> Self {
        Self::with_backend(bus, config, Box::new(EchoShell))
    }

    pub fn with_backend(bus: EventBus, config: &KernelConfig, backend: Box<dyn ShellBackend>) -> Self {
        Self {
            terminals: BTreeMap::new(),
            order: Vec::new(),
            active: None,
            pending: VecDeque::new(),
            backend,
            created: 0,
            default_cwd: config.terminal_cwd.clone(),
            history_limit: config.terminal_history_limit.max(1),
            output_limit: config.terminal_output_limit.max(1),
            bus,
        }
    }

    pub fn set_backend(&mut self, backend: Box<dyn ShellBackend>) {
        self.backend = backend;
    }

    /// Creates a terminal and makes it active.
    pub fn create_terminal(&mut self, name: Option<&str>, cwd: Option<&str>) -> TerminalId {
        self.created += 1;
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Terminal {}", self.created));
        let terminal = Terminal {
            id: TerminalId::new(),
            name: name.clone(),
            cwd: cwd
                .map(str::trim)
                .filter(|cwd| !cwd.is_empty())
                .unwrap_or(self.default_cwd.as_str())
                .to_string(),
            history: VecDeque::new(),
            output: VecDeque::new(),
            running: false,
        };
        let id = terminal.id;
        self.terminals.insert(id, terminal);
        self.order.push(id);
        self.active = Some(id);

        debug!("event=terminal_create module=terminal status=ok terminal_id={id}");
        self.bus.emit(KernelEvent::TerminalCreated {
            terminal_id: id,
            name,
        });
        id
    }

    /// Closes a terminal, dropping any queued execution for it.
    pub fn close_terminal(&mut self, id: TerminalId) -> KernelResult<()> {
        if self.terminals.remove(&id).is_none() {
            return Err(unknown_terminal(id));
        }
        self.order.retain(|existing| *existing != id);
        self.pending.retain(|handle| {
            if handle.terminal_id == id {
                handle.flag.cancel();
                false
            } else {
                true
            }
        });
        if self.active == Some(id) {
            self.active = self.order.last().copied();
        }
        self.bus.emit(KernelEvent::TerminalClosed { terminal_id: id });
        Ok(())
    }

    pub fn switch_terminal(&mut self, id: TerminalId) -> KernelResult<()> {
        if !self.terminals.contains_key(&id) {
            return Err(unknown_terminal(id));
        }
        self.active = Some(id);
        self.bus.emit(KernelEvent::TerminalSwitched { terminal_id: id });
        Ok(())
    }

    pub fn clear_terminal(&mut self, id: TerminalId) -> KernelResult<()> {
        self.terminal_mut(id)?.output.clear();
        Ok(())
    }

    /// Queues `command`; output arrives through `run_pending`.
    pub fn execute_command(&mut self, id: TerminalId, command: &str) -> KernelResult<ExecutionHandle> {
        let command = command.trim();
        if command.is_empty() {
            return Err(KernelError::validation("terminal command must not be empty"));
        }
        let history_limit = self.history_limit;
        let terminal = self.terminal_mut(id)?;
        if terminal.running {
            return Err(KernelError::state(
                "executeCommand",
                format!("terminal `{}` is running a command", terminal.name),
            ));
        }

        terminal.running = true;
        terminal.history.push_back(command.to_string());
        while terminal.history.len() > history_limit {
            terminal.history.pop_front();
        }

        let handle = ExecutionHandle {
            terminal_id: id,
            command: command.to_string(),
            flag: CancellationFlag::new(),
        };
        self.pending.push_back(handle.clone());

        debug!("event=terminal_exec module=terminal status=queued terminal_id={id}");
        self.bus.emit(KernelEvent::TerminalCommand {
            terminal_id: id,
            command: command.to_string(),
        });
        Ok(handle)
    }

    /// Aborts a queued execution. Returns `false` if it already completed.
    pub fn cancel(&mut self, handle: &ExecutionHandle) -> bool {
        handle.flag.cancel();
        let Some(index) = self
            .pending
            .iter()
            .position(|queued| queued.flag.ptr_eq(&handle.flag))
        else {
            return false;
        };
        if let Some(queued) = self.pending.remove(index) {
            self.abort(queued);
        }
        true
    }

    /// Completes every queued execution; returns how many completed or aborted.
    pub fn run_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(handle) = self.pending.pop_front() {
            if !self.terminals.contains_key(&handle.terminal_id) {
                continue;
            }
            if handle.flag.is_cancelled() {
                self.abort(handle);
            } else {
                self.complete(handle);
            }
            delivered += 1;
        }
        delivered
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn get(&self, id: TerminalId) -> Option<&Terminal> {
        self.terminals.get(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Terminal> {
        self.order
            .iter()
            .filter_map(|id| self.terminals.get(id))
            .find(|terminal| terminal.name == name)
    }

    pub fn active_id(&self) -> Option<TerminalId> {
        self.active
    }

    /// Terminals in creation order.
    pub fn list(&self) -> Vec<&Terminal> {
        self.order
            .iter()
            .filter_map(|id| self.terminals.get(id))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        for handle in self.pending.drain(..) {
            handle.flag.cancel();
        }
        self.terminals.clear();
        self.order.clear();
        self.active = None;
        self.created = 0;
    }

    fn complete(&mut self, handle: ExecutionHandle) {
        let Some(cwd) = self.terminals.get(&handle.terminal_id).map(|t| t.cwd.clone()) else {
            return;
        };
        let result = self.backend.run(&cwd, &handle.command);
        let output_limit = self.output_limit;
        let Some(terminal) = self.terminals.get_mut(&handle.terminal_id) else {
            return;
        };

        let mut lines = Vec::with_capacity(result.lines.len() + 1);
        if result.clear {
            terminal.output.clear();
        } else {
            lines.push(format!("$ {}", handle.command));
            lines.extend(result.lines);
        }
        if let Some(cwd) = result.cwd {
            terminal.cwd = cwd;
        }
        terminal.output.extend(lines.iter().cloned());
        while terminal.output.len() > output_limit {
            terminal.output.pop_front();
        }
        terminal.running = false;

        if result.exit_code != 0 {
            warn!(
                "event=terminal_exec module=terminal status=error terminal_id={} exit_code={}",
                handle.terminal_id, result.exit_code
            );
        }
        self.bus.emit(KernelEvent::TerminalOutput {
            terminal_id: handle.terminal_id,
            command: handle.command,
            lines,
            exit_code: result.exit_code,
        });
    }

    fn abort(&mut self, handle: ExecutionHandle) {
        let output_limit = self.output_limit;
        let Some(terminal) = self.terminals.get_mut(&handle.terminal_id) else {
            return;
        };
        terminal.running = false;
        terminal.output.push_back(INTERRUPT_LINE.to_string());
        while terminal.output.len() > output_limit {
            terminal.output.pop_front();
        }

        debug!(
            "event=terminal_exec module=terminal status=aborted terminal_id={}",
            handle.terminal_id
        );
        self.bus.emit(KernelEvent::TerminalAborted {
            terminal_id: handle.terminal_id,
            command: handle.command,
        });
    }

    fn terminal_mut(&mut self, id: TerminalId) -> KernelResult<&mut Terminal> {
        self.terminals.get_mut(&id).ok_or_else(|| unknown_terminal(id))
    }
}

fn unknown_terminal(id: TerminalId) -> KernelError {
    KernelError::validation(format!("terminal not found: {id}"))
}
