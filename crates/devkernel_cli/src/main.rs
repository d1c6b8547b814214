//! Scripted kernel walkthrough.
//!
//! # Responsibility
//! - Boot a kernel outside any UI host and drive a short editing session.
//! - Print every bus event as one wire-JSON line so hosts can diff the stream.

use clap::Parser;
use devkernel_core::service::debugger::{DebugConfig, TraceAdapter, TracePoint};
use devkernel_core::{CommandOutcome, Kernel, KernelConfig, KernelResult};
use log::{error, info};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

/// Drives the devkernel through a scripted session.
#[derive(Parser, Debug)]
#[command(name = "devkernel")]
#[command(version, about, long_about = None)]
struct Args {
    /// Kernel configuration as JSON; omitted fields use defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Absolute directory for rotated log files. Logging is off when omitted.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Skip the built-in plugins.
    #[arg(long)]
    no_plugins: bool,

    /// Print only the health check and exit.
    #[arg(long)]
    ping: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.ping {
        println!("devkernel_core ping={}", devkernel_core::ping());
        println!("devkernel_core version={}", devkernel_core::core_version());
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error message={err}");
            eprintln!("devkernel: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> KernelResult<()> {
    if let Some(log_dir) = &args.log_dir {
        let level = args
            .log_level
            .as_deref()
            .unwrap_or(devkernel_core::default_log_level());
        devkernel_core::init_logging(level, log_dir)?;
    }

    let mut config = load_config(args.config.as_ref())?;
    if args.no_plugins {
        config.builtin_plugins = false;
    }
    let mut kernel = Kernel::with_config(config)?;
    kernel.on_any(|event| {
        let line = event.to_wire_json().map_err(|err| err.to_string())?;
        println!("{line}");
        Ok(())
    });
    kernel.initialize()?;
    info!("event=cli_session module=cli status=start");

    edit_session(&mut kernel)?;
    terminal_session(&mut kernel)?;
    debug_session(&mut kernel)?;
    assistant_session(&mut kernel)?;

    kernel.shutdown()?;
    info!("event=cli_session module=cli status=ok");
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> KernelResult<KernelConfig> {
    let Some(path) = path else {
        return Ok(KernelConfig::default());
    };
    let raw = std::fs::read_to_string(path).map_err(|err| {
        devkernel_core::KernelError::validation(format!(
            "cannot read config `{}`: {err}",
            path.display()
        ))
    })?;
    KernelConfig::from_json_str(&raw)
}

fn report(command: &str, outcome: CommandOutcome) {
    if !outcome.is_executed() {
        eprintln!("devkernel: {command} -> {outcome:?}");
    }
}

fn edit_session(kernel: &mut Kernel) -> KernelResult<()> {
    kernel.with_context(|ctx| ctx.workspace.create_folder("/src"))?;
    report(
        "file.new",
        kernel.execute_command(
            "file.new",
            json!({ "path": "/src/main.rs", "content": "fn main() {\n\tprintln!(\"hi\");   \n}" }),
        ),
    );
    if kernel.config().builtin_plugins {
        report(
            "formatDocument",
            kernel.handle_key("Shift+Alt+F").unwrap_or(CommandOutcome::NotFound),
        );
    }
    report("file.save", kernel.handle_key("Ctrl+S").unwrap_or(CommandOutcome::NotFound));
    report(
        "search.findInFiles",
        kernel.execute_command("search.findInFiles", json!({ "query": "println" })),
    );
    for hit in kernel.context().editors.last_search() {
        println!("# hit {}:{}:{} {}", hit.path, hit.line, hit.column, hit.matched_text);
    }
    Ok(())
}

fn terminal_session(kernel: &mut Kernel) -> KernelResult<()> {
    report(
        "terminal.new",
        kernel.execute_command("terminal.new", json!({ "name": "T1" })),
    );
    let terminal = kernel
        .context()
        .terminals
        .active_id()
        .ok_or_else(|| devkernel_core::KernelError::state("terminal", "no active terminal"))?;
    kernel.with_context(|ctx| ctx.terminals.execute_command(terminal, "echo hi"))?;
    kernel.run_pending();
    Ok(())
}

fn debug_session(kernel: &mut Kernel) -> KernelResult<()> {
    let trace = vec![
        TracePoint::new("/src/main.rs", 1, "main", 0),
        TracePoint::new("/src/main.rs", 2, "main", 0).with_variable("greeting", "hi"),
        TracePoint::new("/src/main.rs", 3, "main", 0),
    ];
    kernel.with_context(|ctx| {
        ctx.debugger.set_adapter(Box::new(TraceAdapter::new(trace)))?;
        ctx.debugger.toggle_breakpoint("/src/main.rs", 2)?;
        ctx.debugger
            .start_debugging(DebugConfig::new("Launch main", "/src/main.rs"))
            .map(drop)
    })?;
    kernel.run_pending();
    report("debugger.continue", kernel.execute_command("debugger.continue", json!(null)));
    kernel.run_pending();
    report("debugger.stop", kernel.execute_command("debugger.stop", json!(null)));
    Ok(())
}

fn assistant_session(kernel: &mut Kernel) -> KernelResult<()> {
    kernel.with_context(|ctx| ctx.ai.send_message("What does main do?"))?;
    kernel.run_pending();

    kernel.with_context(|ctx| ctx.performance.start_monitoring())?;
    kernel.run_pending();
    let report = kernel.context().performance.get_report();
    for line in &report.recommendations {
        println!("# recommendation {line}");
    }
    kernel.with_context(|ctx| ctx.performance.stop_monitoring())
}
