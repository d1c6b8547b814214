//! Kernel event catalogue.
//!
//! Every variant carries a stable wire name (`category:action`) that is the
//! cross-boundary contract with hosting UIs. Wire JSON is
//! `{"type": "<wire name>", "payload": {...}}`.

use crate::model::ids::{EditorId, ParticipantId, SessionId, TerminalId};
use crate::service::collaboration::PresenceStatus;
use crate::service::editor::SplitDirection;
use serde::Serialize;

/// Events flowing through the kernel event bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum KernelEvent {
    // =========================================================================
    // Workspace
    // =========================================================================
    #[serde(rename = "file:created")]
    FileCreated { path: String, language: String },
    #[serde(rename = "file:saved")]
    FileSaved { path: String, size: usize },
    #[serde(rename = "file:opened")]
    FileOpened { path: String },
    #[serde(rename = "file:closed")]
    FileClosed { path: String },
    #[serde(rename = "file:renamed")]
    FileRenamed { old_path: String, new_path: String },
    #[serde(rename = "file:deleted")]
    FileDeleted { path: String },
    /// Content changed without a save.
    #[serde(rename = "file:modified")]
    FileModified { path: String },
    #[serde(rename = "folder:created")]
    FolderCreated { path: String },
    #[serde(rename = "folder:deleted")]
    FolderDeleted {
        path: String,
        removed_files: Vec<String>,
    },
    #[serde(rename = "folder:toggled")]
    FolderToggled { path: String, expanded: bool },

    // =========================================================================
    // Editor
    // =========================================================================
    #[serde(rename = "editor:created")]
    EditorCreated { editor_id: EditorId, path: String },
    #[serde(rename = "editor:closed")]
    EditorClosed { editor_id: EditorId, path: String },
    #[serde(rename = "editor:switched")]
    EditorSwitched { editor_id: EditorId },
    #[serde(rename = "editor:split")]
    EditorSplit {
        source_id: EditorId,
        editor_id: EditorId,
        direction: SplitDirection,
    },
    #[serde(rename = "editor:merged")]
    EditorMerged { merged_groups: usize },

    // =========================================================================
    // Terminal
    // =========================================================================
    #[serde(rename = "terminal:created")]
    TerminalCreated { terminal_id: TerminalId, name: String },
    #[serde(rename = "terminal:closed")]
    TerminalClosed { terminal_id: TerminalId },
    #[serde(rename = "terminal:switched")]
    TerminalSwitched { terminal_id: TerminalId },
    #[serde(rename = "terminal:command")]
    TerminalCommand {
        terminal_id: TerminalId,
        command: String,
    },
    #[serde(rename = "terminal:output")]
    TerminalOutput {
        terminal_id: TerminalId,
        command: String,
        lines: Vec<String>,
        exit_code: i32,
    },
    #[serde(rename = "terminal:aborted")]
    TerminalAborted {
        terminal_id: TerminalId,
        command: String,
    },

    // =========================================================================
    // Debugger
    // =========================================================================
    #[serde(rename = "debugger:started")]
    DebuggerStarted { name: String },
    #[serde(rename = "debugger:stopped")]
    DebuggerStopped,
    #[serde(rename = "debugger:stepOver")]
    DebuggerStepOver,
    #[serde(rename = "debugger:stepInto")]
    DebuggerStepInto,
    #[serde(rename = "debugger:stepOut")]
    DebuggerStepOut,
    #[serde(rename = "debugger:continue")]
    DebuggerContinue,
    #[serde(rename = "debugger:paused")]
    DebuggerPaused { file: String, line: u32 },
    #[serde(rename = "debugger:output")]
    DebuggerOutput { message: String },
    #[serde(rename = "debugger:terminated")]
    DebuggerTerminated,
    #[serde(rename = "debugger:aborted")]
    DebuggerAborted,
    #[serde(rename = "debugger:breakpointAdded")]
    BreakpointAdded { file: String, line: u32 },
    #[serde(rename = "debugger:breakpointRemoved")]
    BreakpointRemoved { file: String, line: u32 },

    // =========================================================================
    // AI assistant
    // =========================================================================
    #[serde(rename = "ai:chatStarted")]
    AiChatStarted,
    #[serde(rename = "ai:messageReceived")]
    AiMessageReceived { content: String },

    // =========================================================================
    // Collaboration
    // =========================================================================
    #[serde(rename = "collaboration:sessionStarted")]
    SessionStarted {
        session_id: SessionId,
        host_id: ParticipantId,
    },
    #[serde(rename = "collaboration:sessionJoined")]
    SessionJoined {
        session_id: SessionId,
        participant_id: ParticipantId,
        name: String,
    },
    #[serde(rename = "collaboration:sessionLeft")]
    SessionLeft {
        session_id: SessionId,
        participant_id: ParticipantId,
    },
    #[serde(rename = "collaboration:fileShared")]
    FileShared { session_id: SessionId, path: String },
    #[serde(rename = "collaboration:userFollowed")]
    UserFollowed { participant_id: ParticipantId },
    #[serde(rename = "collaboration:presenceChanged")]
    PresenceChanged {
        participant_id: ParticipantId,
        status: PresenceStatus,
    },

    // =========================================================================
    // Performance
    // =========================================================================
    #[serde(rename = "performance:monitoringStarted")]
    MonitoringStarted,
    #[serde(rename = "performance:monitoringStopped")]
    MonitoringStopped,
    #[serde(rename = "performance:optimizationStarted")]
    OptimizationStarted,
    #[serde(rename = "performance:optimizationCompleted")]
    OptimizationCompleted { actions: Vec<String> },

    // =========================================================================
    // Plugins
    // =========================================================================
    #[serde(rename = "plugin:installing")]
    PluginInstalling { plugin_id: String },
    #[serde(rename = "plugin:installed")]
    PluginInstalled { plugin_id: String, version: String },
    #[serde(rename = "plugin:uninstalling")]
    PluginUninstalling { plugin_id: String },
    #[serde(rename = "plugin:uninstalled")]
    PluginUninstalled { plugin_id: String },
    #[serde(rename = "plugin:enabled")]
    PluginEnabled { plugin_id: String },
    #[serde(rename = "plugin:disabled")]
    PluginDisabled { plugin_id: String },
    #[serde(rename = "plugin:updating")]
    PluginUpdating { plugin_id: String },
    #[serde(rename = "plugin:updated")]
    PluginUpdated { plugin_id: String, version: String },

    // =========================================================================
    // Registries and kernel
    // =========================================================================
    #[serde(rename = "command:registered")]
    CommandRegistered { command_id: String },
    #[serde(rename = "command:unregistered")]
    CommandUnregistered { command_id: String },
    #[serde(rename = "keybinding:registered")]
    KeybindingRegistered { key: String, command_id: String },
    #[serde(rename = "kernel:initialized")]
    KernelInitialized,
    #[serde(rename = "kernel:shutdown")]
    KernelShutdown,
    /// UI-triggered failure degraded to a no-op.
    #[serde(rename = "kernel:diagnostic")]
    Diagnostic {
        operation: String,
        kind: String,
        message: String,
    },
}

impl KernelEvent {
    /// Stable wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileCreated { .. } => "file:created",
            Self::FileSaved { .. } => "file:saved",
            Self::FileOpened { .. } => "file:opened",
            Self::FileClosed { .. } => "file:closed",
            Self::FileRenamed { .. } => "file:renamed",
            Self::FileDeleted { .. } => "file:deleted",
            Self::FileModified { .. } => "file:modified",
            Self::FolderCreated { .. } => "folder:created",
            Self::FolderDeleted { .. } => "folder:deleted",
            Self::FolderToggled { .. } => "folder:toggled",
            Self::EditorCreated { .. } => "editor:created",
            Self::EditorClosed { .. } => "editor:closed",
            Self::EditorSwitched { .. } => "editor:switched",
            Self::EditorSplit { .. } => "editor:split",
            Self::EditorMerged { .. } => "editor:merged",
            Self::TerminalCreated { .. } => "terminal:created",
            Self::TerminalClosed { .. } => "terminal:closed",
            Self::TerminalSwitched { .. } => "terminal:switched",
            Self::TerminalCommand { .. } => "terminal:command",
            Self::TerminalOutput { .. } => "terminal:output",
            Self::TerminalAborted { .. } => "terminal:aborted",
            Self::DebuggerStarted { .. } => "debugger:started",
            Self::DebuggerStopped => "debugger:stopped",
            Self::DebuggerStepOver => "debugger:stepOver",
            Self::DebuggerStepInto => "debugger:stepInto",
            Self::DebuggerStepOut => "debugger:stepOut",
            Self::DebuggerContinue => "debugger:continue",
            Self::DebuggerPaused { .. } => "debugger:paused",
            Self::DebuggerOutput { .. } => "debugger:output",
            Self::DebuggerTerminated => "debugger:terminated",
            Self::DebuggerAborted => "debugger:aborted",
            Self::BreakpointAdded { .. } => "debugger:breakpointAdded",
            Self::BreakpointRemoved { .. } => "debugger:breakpointRemoved",
            Self::AiChatStarted => "ai:chatStarted",
            Self::AiMessageReceived { .. } => "ai:messageReceived",
            Self::SessionStarted { .. } => "collaboration:sessionStarted",
            Self::SessionJoined { .. } => "collaboration:sessionJoined",
            Self::SessionLeft { .. } => "collaboration:sessionLeft",
            Self::FileShared { .. } => "collaboration:fileShared",
            Self::UserFollowed { .. } => "collaboration:userFollowed",
            Self::PresenceChanged { .. } => "collaboration:presenceChanged",
            Self::MonitoringStarted => "performance:monitoringStarted",
            Self::MonitoringStopped => "performance:monitoringStopped",
            Self::OptimizationStarted => "performance:optimizationStarted",
            Self::OptimizationCompleted { .. } => "performance:optimizationCompleted",
            Self::PluginInstalling { .. } => "plugin:installing",
            Self::PluginInstalled { .. } => "plugin:installed",
            Self::PluginUninstalling { .. } => "plugin:uninstalling",
            Self::PluginUninstalled { .. } => "plugin:uninstalled",
            Self::PluginEnabled { .. } => "plugin:enabled",
            Self::PluginDisabled { .. } => "plugin:disabled",
            Self::PluginUpdating { .. } => "plugin:updating",
            Self::PluginUpdated { .. } => "plugin:updated",
            Self::CommandRegistered { .. } => "command:registered",
            Self::CommandUnregistered { .. } => "command:unregistered",
            Self::KeybindingRegistered { .. } => "keybinding:registered",
            Self::KernelInitialized => "kernel:initialized",
            Self::KernelShutdown => "kernel:shutdown",
            Self::Diagnostic { .. } => "kernel:diagnostic",
        }
    }

    /// Category prefix of the wire name (`file`, `debugger`, ...).
    pub fn category(&self) -> &'static str {
        let name = self.name();
        name.split_once(':').map(|(category, _)| category).unwrap_or(name)
    }

    /// Encodes this event in its wire JSON form.
    pub fn to_wire_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
