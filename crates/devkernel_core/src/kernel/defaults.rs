//! Commands the kernel registers on `initialize`.
//!
//! Each command is a thin adapter from JSON arguments to one manager call.

use crate::command::{parse_args, Command, CommandRegistry};
use crate::error::{KernelError, KernelResult};
use crate::kernel::KernelContext;
use crate::model::file::normalize_path;
use crate::service::debugger::DebugConfig;
use crate::service::editor::{CursorPosition, Decoration};
use crate::service::search::SearchOptions;
use serde::Deserialize;

const DEFAULT_LAUNCH_NAME: &str = "Launch";

#[derive(Debug, Deserialize)]
struct NewFileArgs {
    path: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SaveFileArgs {
    path: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewTerminalArgs {
    name: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindArgs {
    query: String,
    #[serde(default)]
    options: SearchOptions,
}

pub(crate) fn register_default_commands(commands: &mut CommandRegistry) -> KernelResult<()> {
    commands.register(Command::new("file.new", "New File", "File", new_file))?;
    commands.register(Command::new("file.save", "Save File", "File", save_file))?;
    commands.register(
        Command::new(
            "editor.action.triggerSuggest",
            "Trigger Suggestion",
            "Editor",
            trigger_suggest,
        )
        .with_guard(|ctx| ctx.editors.active().is_some()),
    )?;

    commands.register(Command::new(
        "debugger.start",
        "Start Debugging",
        "Debug",
        start_debugging,
    ))?;
    commands.register(Command::new("debugger.stop", "Stop Debugging", "Debug", |ctx, _| {
        ctx.debugger.stop_debugging()
    }))?;
    commands.register(Command::new("debugger.stepOver", "Step Over", "Debug", |ctx, _| {
        ctx.debugger.step_over().map(drop)
    }))?;
    commands.register(Command::new("debugger.stepInto", "Step Into", "Debug", |ctx, _| {
        ctx.debugger.step_into().map(drop)
    }))?;
    commands.register(Command::new("debugger.stepOut", "Step Out", "Debug", |ctx, _| {
        ctx.debugger.step_out().map(drop)
    }))?;
    commands.register(Command::new("debugger.continue", "Continue", "Debug", |ctx, _| {
        ctx.debugger.continue_execution().map(drop)
    }))?;

    commands.register(Command::new("terminal.new", "New Terminal", "Terminal", |ctx, args| {
        let args: NewTerminalArgs = parse_args(args)?;
        ctx.terminals
            .create_terminal(args.name.as_deref(), args.cwd.as_deref());
        Ok(())
    }))?;
    commands.register(Command::new(
        "search.findInFiles",
        "Find in Files",
        "Search",
        find_in_files,
    ))?;
    Ok(())
}

fn new_file(ctx: &mut KernelContext, args: &serde_json::Value) -> KernelResult<()> {
    let args: NewFileArgs = parse_args(args)?;
    let file = ctx.workspace.create_file(&args.path, args.content)?;
    ctx.open_file(&file.path)?;
    Ok(())
}

/// Saves `path` (default: the active editor) with `content` (default: editor buffer).
fn save_file(ctx: &mut KernelContext, args: &serde_json::Value) -> KernelResult<()> {
    let args: SaveFileArgs = parse_args(args)?;
    let path = match args.path {
        Some(path) => path,
        None => ctx
            .editors
            .active()
            .map(|editor| editor.path.clone())
            .ok_or_else(|| KernelError::validation("no path given and no active editor"))?,
    };
    let content = match args.content {
        Some(content) => content,
        None => buffer_for(ctx, &path)?,
    };
    ctx.workspace.save_file(&path, content)?;
    Ok(())
}

fn buffer_for(ctx: &KernelContext, path: &str) -> KernelResult<String> {
    let path = normalize_path(path)?;
    if let Some(editor) = ctx.editors.active().filter(|editor| editor.path == path) {
        return Ok(editor.content.clone());
    }
    if let Some(editor) = ctx
        .editors
        .editors_for_path(&path)
        .first()
        .and_then(|id| ctx.editors.get(*id))
    {
        return Ok(editor.content.clone());
    }
    ctx.workspace
        .file(&path)
        .map(|file| file.content.clone())
        .ok_or_else(|| KernelError::validation(format!("file not found: {path}")))
}

/// Asks the assistant to complete the text before the cursor and shows it as a decoration.
fn trigger_suggest(ctx: &mut KernelContext, _: &serde_json::Value) -> KernelResult<()> {
    let (id, prefix, line) = {
        let editor = ctx
            .editors
            .active()
            .ok_or_else(|| KernelError::state("triggerSuggest", "no active editor"))?;
        (editor.id, text_before(&editor.content, editor.cursor), editor.cursor.line)
    };
    let suggestion = ctx.ai.complete(&prefix)?;
    ctx.editors.add_decoration(
        id,
        Decoration {
            line,
            kind: "suggestion".to_string(),
            message: suggestion,
        },
    )
}

fn text_before(content: &str, cursor: CursorPosition) -> String {
    let mut prefix = String::new();
    for (index, line) in content.split('\n').enumerate() {
        let number = index as u32 + 1;
        if number < cursor.line {
            prefix.push_str(line);
            prefix.push('\n');
        } else {
            let take = cursor.column.saturating_sub(1) as usize;
            prefix.extend(line.chars().take(take));
            break;
        }
    }
    prefix
}

/// Launches a session; `program` defaults to the active editor's file.
fn start_debugging(ctx: &mut KernelContext, args: &serde_json::Value) -> KernelResult<()> {
    let mut config: DebugConfig = parse_args(args)?;
    if config.program.trim().is_empty() {
        config.program = ctx
            .editors
            .active()
            .map(|editor| editor.path.clone())
            .ok_or_else(|| KernelError::validation("no program given and no active editor"))?;
    }
    if config.name.trim().is_empty() {
        config.name = DEFAULT_LAUNCH_NAME.to_string();
    }
    ctx.debugger.start_debugging(config).map(drop)
}

fn find_in_files(ctx: &mut KernelContext, args: &serde_json::Value) -> KernelResult<()> {
    let mut args: FindArgs = parse_args(args)?;
    let limit = ctx.config.search_max_results;
    args.options.max_results = Some(args.options.max_results.map_or(limit, |max| max.min(limit)));
    let hits = ctx
        .editors
        .find_in_files(ctx.workspace.files(), &args.query, &args.options)?;
    ctx.editors.remember_search(hits);
    Ok(())
}
