use devkernel_core::service::ai::{AssistTask, AssistantBackend, ChatRole};
use devkernel_core::service::collaboration::PresenceStatus;
use devkernel_core::service::debugger::{
    Breakpoint, DebugConfig, DebugState, TraceAdapter, TracePoint,
};
use devkernel_core::service::performance::{FixedMetrics, MetricsSample};
use devkernel_core::{CommandOutcome, Kernel, KernelError, KernelEvent};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn booted() -> Kernel {
    let mut kernel = Kernel::new();
    kernel.initialize().unwrap();
    kernel
}

fn record(kernel: &Kernel, category: &'static str) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    kernel.on_any(move |event: &KernelEvent| {
        if event.category() == category {
            sink.borrow_mut().push(event.name().to_string());
        }
        Ok(())
    });
    seen
}

#[test]
fn terminal_runs_command_through_pending_work() {
    let mut kernel = booted();
    let id = kernel
        .with_context(|ctx| ctx.terminals.create_terminal(Some("T1"), None));
    let terminal = kernel.context().terminals.find_by_name("T1").unwrap();
    assert_eq!(terminal.id, id);

    kernel
        .with_context(|ctx| ctx.terminals.execute_command(id, "echo hi"))
        .unwrap();
    assert!(kernel.context().terminals.get(id).unwrap().running);

    assert_eq!(kernel.run_pending(), 1);

    let terminal = kernel.context().terminals.get(id).unwrap();
    assert!(!terminal.running);
    assert!(terminal.output.iter().any(|line| line == "$ echo hi"));
    assert!(terminal.output.iter().any(|line| line == "hi"));
    assert_eq!(terminal.history.back().map(String::as_str), Some("echo hi"));
}

#[test]
fn second_command_while_running_is_rejected() {
    let mut kernel = booted();
    let id = kernel.with_context(|ctx| ctx.terminals.create_terminal(None, None));
    kernel
        .with_context(|ctx| ctx.terminals.execute_command(id, "pwd"))
        .unwrap();

    let err = kernel
        .with_context(|ctx| ctx.terminals.execute_command(id, "ls"))
        .unwrap_err();

    assert!(matches!(err, KernelError::State { .. }));
    assert_eq!(kernel.context().terminals.get(id).unwrap().history.len(), 1);
}

#[test]
fn cancelled_execution_aborts_instead_of_completing() {
    let mut kernel = booted();
    let seen = record(&kernel, "terminal");
    let id = kernel.with_context(|ctx| ctx.terminals.create_terminal(None, None));
    let handle = kernel
        .with_context(|ctx| ctx.terminals.execute_command(id, "echo never"))
        .unwrap();

    handle.cancellation().cancel();
    kernel.run_pending();

    let terminal = kernel.context().terminals.get(id).unwrap();
    assert!(!terminal.running);
    assert!(!terminal.output.iter().any(|line| line == "never"));
    let seen = seen.borrow();
    assert!(seen.contains(&"terminal:aborted".to_string()));
    assert!(!seen.contains(&"terminal:output".to_string()));
}

#[test]
fn debugger_session_start_and_stop() {
    let mut kernel = booted();
    kernel
        .with_context(|ctx| {
            ctx.debugger
                .start_debugging(DebugConfig::new("Launch", "/src/a.js"))
        })
        .unwrap();
    assert!(kernel.context().debugger.is_debugging());

    kernel
        .with_context(|ctx| ctx.debugger.add_breakpoint(Breakpoint::new("/src/a.js", 1)))
        .unwrap();
    kernel
        .with_context(|ctx| ctx.debugger.stop_debugging())
        .unwrap();

    let debugger = &kernel.context().debugger;
    assert!(!debugger.is_debugging());
    assert!(debugger.call_stack().is_empty());
    assert_eq!(debugger.breakpoints().len(), 1);
}

#[test]
fn debugger_rejects_double_start_and_idle_steps() {
    let mut kernel = booted();
    let seen = record(&kernel, "debugger");

    let step = kernel.execute_command("debugger.stepOver", json!(null));
    assert!(matches!(
        step,
        CommandOutcome::Failed(KernelError::State { .. })
    ));
    assert!(seen.borrow().is_empty());

    kernel
        .with_context(|ctx| ctx.debugger.start_debugging(DebugConfig::new("A", "/a.py")))
        .unwrap();
    let err = kernel
        .with_context(|ctx| ctx.debugger.start_debugging(DebugConfig::new("B", "/a.py")))
        .unwrap_err();
    assert!(matches!(err, KernelError::State { .. }));
    assert_eq!(*seen.borrow(), vec!["debugger:started"]);
}

#[test]
fn breakpoints_are_unique_per_location() {
    let mut kernel = booted();
    kernel
        .with_context(|ctx| ctx.debugger.add_breakpoint(Breakpoint::new("/m.rs", 4)))
        .unwrap();

    let err = kernel
        .with_context(|ctx| ctx.debugger.add_breakpoint(Breakpoint::new("m.rs", 4)))
        .unwrap_err();

    assert!(matches!(err, KernelError::Conflict(_)));
    assert_eq!(kernel.context().debugger.breakpoints_in("/m.rs").len(), 1);
    assert!(!kernel
        .with_context(|ctx| ctx.debugger.toggle_breakpoint("/m.rs", 4))
        .unwrap());
    assert!(kernel.context().debugger.breakpoints().is_empty());
}

#[test]
fn trace_session_pauses_at_breakpoint_and_logs() {
    let mut kernel = booted();
    let trace = vec![
        TracePoint::new("/main.js", 1, "main", 0).with_variable("n", "1"),
        TracePoint::new("/main.js", 2, "main", 0).with_variable("n", "2"),
        TracePoint::new("/util.js", 7, "helper", 1).with_variable("n", "3"),
        TracePoint::new("/main.js", 3, "main", 0).with_variable("n", "4"),
    ];
    kernel.with_context(|ctx| {
        ctx.debugger
            .set_adapter(Box::new(TraceAdapter::new(trace)))
            .unwrap();
        ctx.debugger
            .add_breakpoint(Breakpoint::new("/main.js", 1).with_log_message("n is {n}"))
            .unwrap();
        ctx.debugger
            .add_breakpoint(Breakpoint::new("/util.js", 7).with_condition("n == 3"))
            .unwrap();
    });

    assert!(kernel
        .execute_command("debugger.start", json!({ "program": "/main.js" }))
        .is_executed());
    kernel.run_pending();

    let debugger = &kernel.context().debugger;
    assert_eq!(debugger.state(), DebugState::Paused);
    assert_eq!(debugger.output(), ["n is 1".to_string()]);
    let frames: Vec<&str> = debugger
        .call_stack()
        .iter()
        .map(|frame| frame.name.as_str())
        .collect();
    assert_eq!(frames, vec!["helper", "main"]);
    assert_eq!(debugger.variables().get("n").map(String::as_str), Some("3"));
    let caller = &debugger.call_stack()[1];
    assert_eq!(caller.variables.get("n").map(String::as_str), Some("2"));

    assert!(kernel.execute_command("debugger.stepOut", json!(null)).is_executed());
    kernel.run_pending();
    let debugger = &kernel.context().debugger;
    assert_eq!(debugger.call_stack()[0].line, 3);

    assert!(kernel.execute_command("debugger.continue", json!(null)).is_executed());
    kernel.run_pending();
    assert_eq!(kernel.context().debugger.state(), DebugState::Stopped);
}

#[test]
fn chat_reply_arrives_on_pending_work() {
    let mut kernel = booted();
    let seen = record(&kernel, "ai");

    kernel
        .with_context(|ctx| ctx.ai.send_message("hello"))
        .unwrap();
    assert_eq!(kernel.context().ai.history().len(), 1);
    assert_eq!(*seen.borrow(), vec!["ai:chatStarted"]);

    kernel.run_pending();

    let history = kernel.context().ai.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, ChatRole::Assistant);
    assert!(history[0].timestamp_ms > 0);
    assert!(history[0].timestamp_ms <= history[1].timestamp_ms);
    assert_eq!(*seen.borrow(), vec!["ai:chatStarted", "ai:messageReceived"]);
}

struct Unreachable;

impl AssistantBackend for Unreachable {
    fn respond(&mut self, _task: AssistTask, _input: &str) -> Result<String, String> {
        Err("model endpoint unreachable".to_string())
    }
}

#[test]
fn failed_chat_reply_is_reported_as_diagnostic() {
    let mut kernel = booted();
    let diagnostics = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&diagnostics);
    kernel.on("kernel:diagnostic", move |event| {
        if let KernelEvent::Diagnostic { operation, kind, .. } = event {
            sink.borrow_mut().push((operation.clone(), kind.clone()));
        }
        Ok(())
    });
    kernel.with_context(|ctx| {
        ctx.ai.set_backend(Box::new(Unreachable));
        ctx.ai.send_message("hi")
    })
    .unwrap();

    assert_eq!(kernel.run_pending(), 1);

    let ai = &kernel.context().ai;
    assert_eq!(ai.history().len(), 1);
    assert!(!ai.has_pending());
    assert_eq!(diagnostics.borrow().len(), 1);
    assert_eq!(diagnostics.borrow()[0].0, "sendMessage");
}

#[test]
fn collaboration_session_ends_when_host_leaves() {
    let mut kernel = booted();
    let session = kernel
        .with_context(|ctx| ctx.collaboration.start_session("host"))
        .unwrap();
    let guest = kernel
        .with_context(|ctx| ctx.collaboration.join_session(session, "guest"))
        .unwrap();
    kernel
        .with_context(|ctx| ctx.collaboration.set_presence(guest, PresenceStatus::Away))
        .unwrap();
    assert_eq!(
        kernel.context().collaboration.participant(guest).unwrap().status,
        PresenceStatus::Away
    );

    let host = kernel.context().collaboration.session().unwrap().host_id;
    kernel
        .with_context(|ctx| ctx.collaboration.leave_session(session, host))
        .unwrap();

    assert!(kernel.context().collaboration.session().is_none());
}

#[test]
fn performance_report_flags_threshold_breaches() {
    let mut kernel = booted();
    kernel.with_context(|ctx| {
        ctx.performance.set_source(Box::new(FixedMetrics(MetricsSample {
            memory_mb: 900.0,
            cpu_percent: 10.0,
            frame_time_ms: 30.0,
        })));
        ctx.performance.start_monitoring().unwrap();
    });
    kernel.run_pending();
    kernel.run_pending();

    let report = kernel.context().performance.get_report();

    assert!(report.monitoring);
    assert!(report.generated_at_ms > 0);
    assert_eq!(report.metrics.samples, 2);
    let metrics: Vec<&str> = report.issues.iter().map(|issue| issue.metric).collect();
    assert_eq!(metrics, vec!["memory_mb", "frame_time_ms"]);
    assert_eq!(report.recommendations.len(), 2);
}
