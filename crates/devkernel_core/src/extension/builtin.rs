//! Plugins shipped with the kernel.
//!
//! `builtin.*` plugins are installed and enabled on boot; `community.*`
//! entries sit in the catalog until a host installs them.

use crate::command::{parse_args, Command};
use crate::error::{KernelError, KernelResult};
use crate::extension::manager::PluginManager;
use crate::extension::manifest::PluginManifest;
use crate::extension::plugin::{ActivationContext, Plugin};
use crate::kernel::KernelContext;
use crate::model::ids::EditorId;
use crate::service::editor::Decoration;
use crate::service::search::SearchOptions;
use crate::service::workspace::FileEdit;
use serde::Deserialize;

pub const FORMATTER_ID: &str = "builtin.formatter";
pub const SEARCH_TOOLS_ID: &str = "builtin.search-tools";
pub const WORD_COUNT_ID: &str = "community.word-count";
pub const FORMAT_ON_SAVE_ID: &str = "community.format-on-save";

/// Installed and enabled by `Kernel::initialize`, in this order.
pub const BUILTIN_PLUGINS: &[&str] = &[FORMATTER_ID, SEARCH_TOOLS_ID];

type Contribute = fn(&mut ActivationContext) -> KernelResult<()>;

/// Plugin whose activation only contributes commands and keybindings.
struct ContributingPlugin {
    manifest: PluginManifest,
    contribute: Contribute,
}

impl Plugin for ContributingPlugin {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn activate(&mut self, ctx: &mut ActivationContext) -> Result<(), String> {
        (self.contribute)(ctx).map_err(|err| err.to_string())
    }
}

fn register(plugins: &mut PluginManager, manifest: PluginManifest, contribute: Contribute) {
    let id = manifest.id.clone();
    plugins.register_factory(&id, move || -> Box<dyn Plugin> {
        Box::new(ContributingPlugin {
            manifest: manifest.clone(),
            contribute,
        })
    });
}

/// Adds every shipped plugin to the catalog.
pub fn register_catalog(plugins: &mut PluginManager) {
    register(
        plugins,
        PluginManifest::new(FORMATTER_ID, "Formatter", "1.0.0")
            .with_description("Normalizes whitespace in the active editor."),
        contribute_formatter,
    );
    register(
        plugins,
        PluginManifest::new(SEARCH_TOOLS_ID, "Search Tools", "1.0.0")
            .with_description("Workspace-wide replace."),
        contribute_search_tools,
    );
    register(
        plugins,
        PluginManifest::new(WORD_COUNT_ID, "Word Count", "0.3.1")
            .with_description("Annotates the active editor with its word count."),
        contribute_word_count,
    );
    register(
        plugins,
        PluginManifest::new(FORMAT_ON_SAVE_ID, "Format on Save", "0.2.0")
            .with_description("Formats the active editor, then saves it.")
            .with_dependency(FORMATTER_ID),
        contribute_format_on_save,
    );
}

/// Trims trailing whitespace, expands leading tabs and ends with one newline.
pub fn format_source(text: &str) -> String {
    let mut lines: Vec<String> = text
        .lines()
        .map(|line| {
            let body = line.trim_start_matches('\t');
            let tabs = line.len() - body.len();
            format!("{}{}", "    ".repeat(tabs), body.trim_end())
        })
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }
    let mut formatted = lines.join("\n");
    formatted.push('\n');
    formatted
}

fn has_active_editor(ctx: &KernelContext) -> bool {
    ctx.editors.active().is_some()
}

fn active_editor(ctx: &KernelContext, operation: &'static str) -> KernelResult<(EditorId, String, String)> {
    let editor = ctx
        .editors
        .active()
        .ok_or_else(|| KernelError::state(operation, "no active editor"))?;
    Ok((editor.id, editor.path.clone(), editor.content.clone()))
}

fn contribute_formatter(ctx: &mut ActivationContext) -> KernelResult<()> {
    ctx.register_command(
        Command::new(
            "editor.action.formatDocument",
            "Format Document",
            "Editor",
            |ctx, _| {
                let (id, _, content) = active_editor(ctx, "formatDocument")?;
                ctx.editors.update_content(id, format_source(&content))
            },
        )
        .with_guard(has_active_editor),
    )?;
    ctx.register_keybinding("Shift+Alt+F", "editor.action.formatDocument")
}

#[derive(Debug, Deserialize)]
struct ReplaceArgs {
    query: String,
    replacement: String,
    #[serde(default)]
    options: SearchOptions,
}

fn contribute_search_tools(ctx: &mut ActivationContext) -> KernelResult<()> {
    ctx.register_command(Command::new(
        "search.replaceInFiles",
        "Replace in Files",
        "Search",
        |ctx, args| {
            let args: ReplaceArgs = parse_args(args)?;
            let results = ctx.editors.replace_in_files(
                ctx.workspace.files(),
                &args.query,
                &args.replacement,
                &args.options,
            )?;
            let edits = results
                .into_iter()
                .map(|result| FileEdit {
                    path: result.path,
                    content: result.content,
                })
                .collect();
            ctx.workspace.apply_edits(edits)
        },
    ))
}

fn contribute_word_count(ctx: &mut ActivationContext) -> KernelResult<()> {
    ctx.register_command(
        Command::new("wordCount.count", "Count Words", "Editor", |ctx, _| {
            let (id, _, content) = active_editor(ctx, "wordCount")?;
            let words = content.split_whitespace().count();
            ctx.editors.add_decoration(
                id,
                Decoration {
                    line: 1,
                    kind: "info".to_string(),
                    message: format!("{words} words"),
                },
            )
        })
        .with_guard(has_active_editor),
    )
}

fn contribute_format_on_save(ctx: &mut ActivationContext) -> KernelResult<()> {
    ctx.register_command(
        Command::new("file.formatAndSave", "Format and Save", "File", |ctx, _| {
            let (_, path, content) = active_editor(ctx, "formatAndSave")?;
            ctx.workspace.save_file(&path, format_source(&content))?;
            Ok(())
        })
        .with_guard(has_active_editor),
    )?;
    ctx.register_keybinding("Ctrl+Shift+S", "file.formatAndSave")
}

#[cfg(test)]
mod tests {
    use super::{format_source, register_catalog, BUILTIN_PLUGINS, FORMAT_ON_SAVE_ID};
    use crate::event::EventBus;
    use crate::extension::manager::PluginManager;

    #[test]
    fn format_source_normalizes_whitespace() {
        assert_eq!(format_source("\tlet x = 1;   \n\n\n"), "    let x = 1;\n");
        assert_eq!(format_source("a\r\nb"), "a\nb\n");
        assert_eq!(format_source("  \n"), "");
    }

    #[test]
    fn catalog_lists_builtins_and_extras() {
        let mut plugins = PluginManager::new(EventBus::new());
        register_catalog(&mut plugins);
        let ids = plugins.catalog_ids();
        for id in BUILTIN_PLUGINS {
            assert!(ids.contains(id));
        }
        assert!(ids.contains(&FORMAT_ON_SAVE_ID));
        assert_eq!(ids.len(), 4);
    }
}
