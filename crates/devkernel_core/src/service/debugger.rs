//! Debugger session manager.
//!
//! # Responsibility
//! - Own breakpoints and the debug session state machine.
//! - Drive an external [`DebugAdapter`]; resumes complete when pending work runs.
//!
//! # Invariants
//! - At most one breakpoint per `(file, line)`.
//! - Step/continue are valid only while paused; otherwise nothing changes.
//! - The call stack is empty unless the session is paused.

use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::model::file::normalize_path;
use crate::task::CancellationFlag;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugState {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl DebugState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl Display for DebugState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Launch configuration handed to the adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    /// Pause on the first executed line instead of running to a breakpoint.
    pub stop_on_entry: bool,
}

impl DebugConfig {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    pub file: String,
    pub line: u32,
    /// Pause only when this evaluates true (`a == 1`, `a != 1`, or a bare name).
    pub condition: Option<String>,
    /// Log point: emit this message (with `{name}` interpolation) instead of pausing.
    pub log_message: Option<String>,
    pub enabled: bool,
}

impl Breakpoint {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            condition: None,
            log_message: None,
            enabled: true,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_log_message(mut self, message: impl Into<String>) -> Self {
        self.log_message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallStackFrame {
    pub name: String,
    pub file: String,
    pub line: u32,
    /// Locals visible in this frame.
    pub variables: BTreeMap<String, String>,
}

/// How the adapter should advance execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Continue,
    Over,
    Into,
    Out,
}

/// Where a resume ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterStop {
    /// `frames` is innermost first.
    Paused {
        frames: Vec<CallStackFrame>,
        output: Vec<String>,
    },
    Exited {
        output: Vec<String>,
    },
}

/// External debug runtime.
pub trait DebugAdapter {
    fn launch(&mut self, config: &DebugConfig) -> Result<(), String>;
    /// Runs until the next stop; only enabled breakpoints are passed.
    fn resume(&mut self, step: StepKind, breakpoints: &[Breakpoint]) -> AdapterStop;
    fn terminate(&mut self);
}

/// One executed line in a scripted trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePoint {
    pub file: String,
    pub line: u32,
    pub function: String,
    /// Call depth, 0 for the entry function.
    pub depth: usize,
    pub variables: BTreeMap<String, String>,
}

impl TracePoint {
    pub fn new(file: &str, line: u32, function: &str, depth: usize) -> Self {
        Self {
            file: file.to_string(),
            line,
            function: function.to_string(),
            depth,
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: &str, value: &str) -> Self {
        self.variables.insert(name.to_string(), value.to_string());
        self
    }
}

/// Adapter replaying a fixed list of trace points.
#[derive(Debug, Clone, Default)]
pub struct TraceAdapter {
    trace: Vec<TracePoint>,
    position: Option<usize>,
}

impl TraceAdapter {
    pub fn new(trace: Vec<TracePoint>) -> Self {
        Self {
            trace,
            position: None,
        }
    }

    fn frames_at(&self, index: usize) -> Vec<CallStackFrame> {
        let mut frames = Vec::new();
        let mut wanted_depth = self.trace[index].depth;
        for point in self.trace[..=index].iter().rev() {
            if point.depth == wanted_depth {
                frames.push(CallStackFrame {
                    name: point.function.clone(),
                    file: point.file.clone(),
                    line: point.line,
                    variables: point.variables.clone(),
                });
                if wanted_depth == 0 {
                    break;
                }
                wanted_depth -= 1;
            }
        }
        frames
    }
}

impl DebugAdapter for TraceAdapter {
    fn launch(&mut self, _config: &DebugConfig) -> Result<(), String> {
        self.position = None;
        Ok(())
    }

    fn resume(&mut self, step: StepKind, breakpoints: &[Breakpoint]) -> AdapterStop {
        let current_depth = self.position.map(|index| self.trace[index].depth);
        let start = self.position.map_or(0, |index| index + 1);
        let mut output = Vec::new();

        for index in start..self.trace.len() {
            let point = &self.trace[index];
            let step_done = match (step, current_depth) {
                (StepKind::Continue, _) => false,
                (StepKind::Into, _) | (_, None) => true,
                (StepKind::Over, Some(depth)) => point.depth <= depth,
                (StepKind::Out, Some(depth)) => point.depth < depth,
            };

            let mut hit = false;
            for breakpoint in breakpoints
                .iter()
                .filter(|bp| bp.file == point.file && bp.line == point.line)
            {
                let passes = breakpoint
                    .condition
                    .as_deref()
                    .map_or(true, |condition| evaluate_condition(condition, &point.variables));
                if !passes {
                    continue;
                }
                match &breakpoint.log_message {
                    Some(message) => output.push(interpolate(message, &point.variables)),
                    None => hit = true,
                }
            }

            if hit || step_done {
                self.position = Some(index);
                return AdapterStop::Paused {
                    frames: self.frames_at(index),
                    output,
                };
            }
        }

        self.position = Some(self.trace.len());
        AdapterStop::Exited { output }
    }

    fn terminate(&mut self) {
        self.position = None;
    }
}

fn evaluate_condition(condition: &str, variables: &BTreeMap<String, String>) -> bool {
    let lookup = |name: &str| variables.get(name.trim()).map(String::as_str);
    if let Some((name, value)) = condition.split_once("!=") {
        return lookup(name) != Some(value.trim());
    }
    if let Some((name, value)) = condition.split_once("==") {
        return lookup(name) == Some(value.trim());
    }
    !matches!(lookup(condition), None | Some("" | "0" | "false"))
}

fn interpolate(message: &str, variables: &BTreeMap<String, String>) -> String {
    let mut rendered = message.to_string();
    for (name, value) in variables {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}

struct PendingResume {
    step: StepKind,
    flag: CancellationFlag,
}

static NO_VARIABLES: BTreeMap<String, String> = BTreeMap::new();

pub struct DebuggerManager {
    state: DebugState,
    session: Option<DebugConfig>,
    breakpoints: BTreeMap<(String, u32), Breakpoint>,
    call_stack: Vec<CallStackFrame>,
    output: Vec<String>,
    pending: Option<PendingResume>,
    adapter: Box<dyn DebugAdapter>,
    bus: EventBus,
}

impl DebuggerManager {
    pub fn new(bus: EventBus) -> Self {
        Self::with_adapter(bus, Box::new(TraceAdapter::default()))
    }

    pub fn with_adapter(bus: EventBus, adapter: Box<dyn DebugAdapter>) -> Self {
        Self {
            state: DebugState::Idle,
            session: None,
            breakpoints: BTreeMap::new(),
            call_stack: Vec::new(),
            output: Vec::new(),
            pending: None,
            adapter,
            bus,
        }
    }

    /// Replaces the adapter; only allowed while idle.
    pub fn set_adapter(&mut self, adapter: Box<dyn DebugAdapter>) -> KernelResult<()> {
        if self.state != DebugState::Idle {
            return Err(KernelError::state("setAdapter", self.state.as_str()));
        }
        self.adapter = adapter;
        Ok(())
    }

    /// idle -> running; the first resume is queued as pending work.
    pub fn start_debugging(&mut self, config: DebugConfig) -> KernelResult<CancellationFlag> {
        if self.state != DebugState::Idle {
            return Err(KernelError::state("startDebugging", self.state.as_str()));
        }
        self.adapter
            .launch(&config)
            .map_err(|message| KernelError::validation(format!("debug launch failed: {message}")))?;

        let step = if config.stop_on_entry {
            StepKind::Into
        } else {
            StepKind::Continue
        };
        let name = config.name.clone();
        self.session = Some(config);
        self.output.clear();
        self.state = DebugState::Running;
        let flag = self.queue(step);

        info!("event=debug_start module=debugger status=ok name={name}");
        self.bus.emit(KernelEvent::DebuggerStarted { name });
        Ok(flag)
    }

    /// Any non-idle state -> idle.
    pub fn stop_debugging(&mut self) -> KernelResult<()> {
        if self.state == DebugState::Idle {
            return Err(KernelError::state("stopDebugging", self.state.as_str()));
        }
        self.adapter.terminate();
        self.reset_session();
        self.bus.emit(KernelEvent::DebuggerStopped);
        Ok(())
    }

    pub fn step_over(&mut self) -> KernelResult<CancellationFlag> {
        self.step("stepOver", StepKind::Over, KernelEvent::DebuggerStepOver)
    }

    pub fn step_into(&mut self) -> KernelResult<CancellationFlag> {
        self.step("stepInto", StepKind::Into, KernelEvent::DebuggerStepInto)
    }

    pub fn step_out(&mut self) -> KernelResult<CancellationFlag> {
        self.step("stepOut", StepKind::Out, KernelEvent::DebuggerStepOut)
    }

    pub fn continue_execution(&mut self) -> KernelResult<CancellationFlag> {
        self.step("continue", StepKind::Continue, KernelEvent::DebuggerContinue)
    }

    /// Aborts a queued resume; the session returns to idle.
    pub fn cancel_pending(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        pending.flag.cancel();
        self.abort();
        true
    }

    /// Completes a queued resume; returns 1 if one was delivered.
    pub fn run_pending(&mut self) -> usize {
        let Some(pending) = self.pending.take() else {
            return 0;
        };
        if pending.flag.is_cancelled() {
            self.abort();
            return 1;
        }

        let enabled: Vec<Breakpoint> = self
            .breakpoints
            .values()
            .filter(|bp| bp.enabled)
            .cloned()
            .collect();
        match self.adapter.resume(pending.step, &enabled) {
            AdapterStop::Paused { frames, output } => {
                self.emit_output(output);
                let location = frames.first().map(|top| (top.file.clone(), top.line));
                self.call_stack = frames;
                self.state = DebugState::Paused;
                if let Some((file, line)) = location {
                    debug!("event=debug_pause module=debugger status=ok line={line}");
                    self.bus.emit(KernelEvent::DebuggerPaused { file, line });
                }
            }
            AdapterStop::Exited { output } => {
                self.emit_output(output);
                self.call_stack.clear();
                self.state = DebugState::Stopped;
                self.bus.emit(KernelEvent::DebuggerTerminated);
            }
        }
        1
    }

    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) -> KernelResult<()> {
        let file = normalize_path(&breakpoint.file)?;
        if breakpoint.line == 0 {
            return Err(KernelError::validation("breakpoint line is 1-based"));
        }
        let key = (file.clone(), breakpoint.line);
        if self.breakpoints.contains_key(&key) {
            return Err(KernelError::conflict(format!(
                "breakpoint already set at {file}:{}",
                breakpoint.line
            )));
        }

        let line = breakpoint.line;
        self.breakpoints.insert(key, Breakpoint { file: file.clone(), ..breakpoint });
        self.bus.emit(KernelEvent::BreakpointAdded { file, line });
        Ok(())
    }

    pub fn remove_breakpoint(&mut self, file: &str, line: u32) -> KernelResult<Breakpoint> {
        let file = normalize_path(file)?;
        let removed = self
            .breakpoints
            .remove(&(file.clone(), line))
            .ok_or_else(|| KernelError::validation(format!("no breakpoint at {file}:{line}")))?;
        self.bus.emit(KernelEvent::BreakpointRemoved { file, line });
        Ok(removed)
    }

    /// Adds or removes a plain breakpoint; returns `true` when one was added.
    pub fn toggle_breakpoint(&mut self, file: &str, line: u32) -> KernelResult<bool> {
        let path = normalize_path(file)?;
        if self.breakpoints.contains_key(&(path.clone(), line)) {
            self.remove_breakpoint(&path, line)?;
            Ok(false)
        } else {
            self.add_breakpoint(Breakpoint::new(path, line))?;
            Ok(true)
        }
    }

    pub fn set_breakpoint_enabled(&mut self, file: &str, line: u32, enabled: bool) -> KernelResult<()> {
        let file = normalize_path(file)?;
        let breakpoint = self
            .breakpoints
            .get_mut(&(file.clone(), line))
            .ok_or_else(|| KernelError::validation(format!("no breakpoint at {file}:{line}")))?;
        breakpoint.enabled = enabled;
        Ok(())
    }

    /// Removes every breakpoint; returns how many were removed.
    pub fn clear_breakpoints(&mut self) -> usize {
        let removed = std::mem::take(&mut self.breakpoints);
        let count = removed.len();
        for (file, line) in removed.into_keys() {
            self.bus.emit(KernelEvent::BreakpointRemoved { file, line });
        }
        count
    }

    pub fn breakpoints(&self) -> Vec<&Breakpoint> {
        self.breakpoints.values().collect()
    }

    pub fn breakpoints_in(&self, file: &str) -> Vec<&Breakpoint> {
        self.breakpoints
            .values()
            .filter(|bp| bp.file == file)
            .collect()
    }

    pub fn state(&self) -> DebugState {
        self.state
    }

    /// `true` from `start_debugging` until `stop_debugging`, including after the program exits.
    pub fn is_debugging(&self) -> bool {
        self.state != DebugState::Idle
    }

    pub fn session(&self) -> Option<&DebugConfig> {
        self.session.as_ref()
    }

    pub fn call_stack(&self) -> &[CallStackFrame] {
        &self.call_stack
    }

    /// Variables of the innermost frame; empty unless paused.
    pub fn variables(&self) -> &BTreeMap<String, String> {
        self.call_stack
            .first()
            .map_or(&NO_VARIABLES, |frame| &frame.variables)
    }

    /// Log point and adapter output of the current session.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Moves breakpoints of a renamed file.
    pub(crate) fn retarget_breakpoints(&mut self, old_path: &str, new_path: &str) {
        let moved: Vec<(String, u32)> = self
            .breakpoints
            .keys()
            .filter(|(file, _)| file == old_path)
            .cloned()
            .collect();
        for key in moved {
            if let Some(mut breakpoint) = self.breakpoints.remove(&key) {
                breakpoint.file = new_path.to_string();
                self.breakpoints
                    .insert((new_path.to_string(), key.1), breakpoint);
            }
        }
    }

    /// Drops the session and breakpoints without emitting events.
    pub(crate) fn clear(&mut self) {
        if self.state != DebugState::Idle {
            self.adapter.terminate();
        }
        self.reset_session();
        self.breakpoints.clear();
        self.output.clear();
    }

    fn step(
        &mut self,
        operation: &'static str,
        kind: StepKind,
        event: KernelEvent,
    ) -> KernelResult<CancellationFlag> {
        if self.state != DebugState::Paused {
            return Err(KernelError::state(operation, self.state.as_str()));
        }
        self.state = DebugState::Running;
        self.call_stack.clear();
        let flag = self.queue(kind);
        self.bus.emit(event);
        Ok(flag)
    }

    fn queue(&mut self, step: StepKind) -> CancellationFlag {
        let flag = CancellationFlag::new();
        self.pending = Some(PendingResume {
            step,
            flag: flag.clone(),
        });
        flag
    }

    fn abort(&mut self) {
        self.adapter.terminate();
        self.reset_session();
        info!("event=debug_abort module=debugger status=aborted");
        self.bus.emit(KernelEvent::DebuggerAborted);
    }

    fn reset_session(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.flag.cancel();
        }
        self.state = DebugState::Idle;
        self.session = None;
        self.call_stack.clear();
    }

    fn emit_output(&mut self, lines: Vec<String>) {
        for message in lines {
            self.output.push(message.clone());
            self.bus.emit(KernelEvent::DebuggerOutput { message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Breakpoint, DebugConfig, DebugState, DebuggerManager, TraceAdapter, TracePoint,
    };
    use crate::error::KernelError;
    use crate::event::{EventBus, KernelEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn trace() -> Vec<TracePoint> {
        vec![
            TracePoint::new("/main.js", 1, "main", 0).with_variable("i", "0"),
            TracePoint::new("/main.js", 2, "main", 0).with_variable("i", "1"),
            TracePoint::new("/lib.js", 10, "helper", 1).with_variable("n", "1"),
            TracePoint::new("/lib.js", 11, "helper", 1).with_variable("n", "2"),
            TracePoint::new("/main.js", 3, "main", 0).with_variable("i", "2"),
        ]
    }

    fn manager() -> (DebuggerManager, Rc<RefCell<Vec<String>>>) {
        let bus = EventBus::new();
        let names = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&names);
        bus.on_any(move |event: &KernelEvent| {
            sink.borrow_mut().push(event.name().to_string());
            Ok(())
        });
        let adapter = Box::new(TraceAdapter::new(trace()));
        (DebuggerManager::with_adapter(bus, adapter), names)
    }

    #[test]
    fn step_while_idle_is_rejected_without_events() {
        let (mut debugger, names) = manager();
        for result in [
            debugger.step_over(),
            debugger.step_into(),
            debugger.step_out(),
            debugger.continue_execution(),
        ] {
            assert!(matches!(result, Err(KernelError::State { .. })));
        }
        assert_eq!(debugger.state(), DebugState::Idle);
        assert!(names.borrow().is_empty());
        assert!(debugger.stop_debugging().is_err());
    }

    #[test]
    fn double_start_is_rejected() {
        let (mut debugger, _) = manager();
        debugger
            .start_debugging(DebugConfig::new("run", "/main.js"))
            .expect("start");
        let err = debugger
            .start_debugging(DebugConfig::new("again", "/main.js"))
            .expect_err("second start");
        assert!(matches!(err, KernelError::State { .. }));
        assert_eq!(debugger.state(), DebugState::Running);
    }

    #[test]
    fn breakpoint_pause_then_step_and_finish() {
        let (mut debugger, names) = manager();
        debugger
            .add_breakpoint(Breakpoint::new("/lib.js", 10))
            .expect("breakpoint");
        debugger
            .start_debugging(DebugConfig::new("run", "/main.js"))
            .expect("start");
        assert_eq!(debugger.state(), DebugState::Running);

        assert_eq!(debugger.run_pending(), 1);
        assert_eq!(debugger.state(), DebugState::Paused);
        let stack: Vec<&str> = debugger.call_stack().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(stack, vec!["helper", "main"]);
        assert_eq!(debugger.variables().get("n").map(String::as_str), Some("1"));
        let caller = &debugger.call_stack()[1];
        assert_eq!(caller.line, 2);
        assert_eq!(caller.variables.get("i").map(String::as_str), Some("1"));
        assert!(!caller.variables.contains_key("n"));

        debugger.step_out().expect("step out");
        assert!(debugger.variables().is_empty());
        assert!(debugger.call_stack().is_empty());
        debugger.run_pending();
        assert_eq!(debugger.call_stack()[0].line, 3);

        debugger.continue_execution().expect("continue");
        debugger.run_pending();
        assert_eq!(debugger.state(), DebugState::Stopped);
        assert!(debugger.call_stack().is_empty());
        assert!(names.borrow().iter().any(|n| n == "debugger:terminated"));

        debugger.stop_debugging().expect("stop");
        assert_eq!(debugger.state(), DebugState::Idle);
    }

    #[test]
    fn step_over_skips_deeper_frames() {
        let (mut debugger, _) = manager();
        let mut config = DebugConfig::new("run", "/main.js");
        config.stop_on_entry = true;
        debugger.start_debugging(config).expect("start");
        debugger.run_pending();
        assert_eq!(debugger.call_stack()[0].line, 1);

        debugger.step_over().expect("over");
        debugger.run_pending();
        assert_eq!(debugger.call_stack()[0].line, 2);
        debugger.step_over().expect("over");
        debugger.run_pending();
        assert_eq!(debugger.call_stack()[0].line, 3);
    }

    #[test]
    fn conditions_and_log_points() {
        let (mut debugger, names) = manager();
        debugger
            .add_breakpoint(Breakpoint::new("/main.js", 1).with_log_message("i is {i}"))
            .expect("log point");
        debugger
            .add_breakpoint(Breakpoint::new("/main.js", 2).with_condition("i == 5"))
            .expect("false condition");
        debugger
            .add_breakpoint(Breakpoint::new("/lib.js", 11).with_condition("n != 1"))
            .expect("true condition");
        debugger
            .start_debugging(DebugConfig::new("run", "/main.js"))
            .expect("start");
        debugger.run_pending();

        assert_eq!(debugger.output(), &["i is 0".to_string()]);
        assert_eq!(debugger.call_stack()[0].line, 11);
        assert!(names.borrow().iter().any(|n| n == "debugger:output"));
    }

    #[test]
    fn duplicate_breakpoint_conflicts_and_toggle_round_trips() {
        let (mut debugger, _) = manager();
        debugger
            .add_breakpoint(Breakpoint::new("/main.js", 1))
            .expect("first");
        let err = debugger
            .add_breakpoint(Breakpoint::new("main.js", 1))
            .expect_err("duplicate");
        assert!(matches!(err, KernelError::Conflict(_)));
        assert_eq!(debugger.breakpoints().len(), 1);

        assert!(!debugger.toggle_breakpoint("/main.js", 1).expect("toggle off"));
        assert!(debugger.toggle_breakpoint("/main.js", 1).expect("toggle on"));
        assert_eq!(debugger.clear_breakpoints(), 1);
        assert!(debugger.remove_breakpoint("/main.js", 1).is_err());
    }

    #[test]
    fn disabled_breakpoints_are_ignored() {
        let (mut debugger, _) = manager();
        debugger
            .add_breakpoint(Breakpoint::new("/lib.js", 10))
            .expect("breakpoint");
        debugger
            .set_breakpoint_enabled("/lib.js", 10, false)
            .expect("disable");
        debugger
            .start_debugging(DebugConfig::new("run", "/main.js"))
            .expect("start");
        debugger.run_pending();
        assert_eq!(debugger.state(), DebugState::Stopped);
    }

    #[test]
    fn cancelling_pending_resume_aborts_session() {
        let (mut debugger, names) = manager();
        debugger
            .start_debugging(DebugConfig::new("run", "/main.js"))
            .expect("start");
        assert!(debugger.cancel_pending());
        assert_eq!(debugger.state(), DebugState::Idle);
        assert_eq!(debugger.run_pending(), 0);
        assert!(names.borrow().iter().any(|n| n == "debugger:aborted"));

        let flag = debugger
            .start_debugging(DebugConfig::new("run", "/main.js"))
            .expect("restart");
        flag.cancel();
        assert_eq!(debugger.run_pending(), 1);
        assert_eq!(debugger.state(), DebugState::Idle);
    }

    #[test]
    fn retarget_moves_breakpoints() {
        let (mut debugger, _) = manager();
        debugger
            .add_breakpoint(Breakpoint::new("/a.js", 4))
            .expect("breakpoint");
        debugger.retarget_breakpoints("/a.js", "/b.js");
        assert!(debugger.breakpoints_in("/a.js").is_empty());
        assert_eq!(debugger.breakpoints_in("/b.js")[0].line, 4);
    }
}
