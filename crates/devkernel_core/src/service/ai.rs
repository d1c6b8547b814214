//! Assistant manager.
//!
//! Code operations answer synchronously through the backend; chat replies are
//! queued and delivered when pending work runs.

use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::model::file::now_epoch_ms;
use log::{debug, warn};
use serde::Serialize;
use std::collections::VecDeque;

/// What the backend is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistTask {
    Generate,
    Explain,
    Refactor,
    Debug,
    Optimize,
    /// Inline completion for the text before the cursor.
    Complete,
    Chat,
}

impl AssistTask {
    fn operation(self) -> &'static str {
        match self {
            Self::Generate => "generateCode",
            Self::Explain => "explainCode",
            Self::Refactor => "refactorCode",
            Self::Debug => "debugCode",
            Self::Optimize => "optimizeCode",
            Self::Complete => "complete",
            Self::Chat => "sendMessage",
        }
    }
}

/// External model backend.
pub trait AssistantBackend {
    fn respond(&mut self, task: AssistTask, input: &str) -> Result<String, String>;
}

/// Deterministic backend used when no model is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAssistant;

impl AssistantBackend for OfflineAssistant {
    fn respond(&mut self, task: AssistTask, input: &str) -> Result<String, String> {
        let reply = match task {
            AssistTask::Generate => format!(
                "// generated from prompt: {}\nfunction generated() {{\n  return null;\n}}\n",
                input.lines().next().unwrap_or_default().trim()
            ),
            AssistTask::Explain => format!(
                "This snippet has {} line(s) and {} character(s).",
                input.lines().count(),
                input.chars().count()
            ),
            AssistTask::Refactor => tidy(input),
            AssistTask::Debug => {
                let findings: Vec<String> = input
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.contains("console.log") || line.contains("debugger"))
                    .map(|(index, _)| format!("line {}: leftover debug statement", index + 1))
                    .collect();
                if findings.is_empty() {
                    "No obvious issues found.".to_string()
                } else {
                    findings.join("\n")
                }
            }
            AssistTask::Optimize => input.replace("var ", "let "),
            AssistTask::Complete => {
                let word = input
                    .rsplit(|c: char| !c.is_alphanumeric() && c != '_')
                    .next()
                    .unwrap_or_default();
                format!("{word}()")
            }
            AssistTask::Chat => format!("Received: {}", input.trim()),
        };
        Ok(reply)
    }
}

fn tidy(input: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in input.lines().map(str::trim_end) {
        if line.is_empty() && lines.last().map_or(true, |last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Unix epoch milliseconds when the entry was appended.
    pub timestamp_ms: i64,
}

impl ChatMessage {
    fn now(role: ChatRole, content: String) -> Self {
        Self {
            role,
            content,
            timestamp_ms: now_epoch_ms(),
        }
    }
}

pub struct AiManager {
    history: Vec<ChatMessage>,
    awaiting: VecDeque<String>,
    /// Replies the backend failed to produce, kept until the kernel reports them.
    failures: Vec<KernelError>,
    backend: Box<dyn AssistantBackend>,
    bus: EventBus,
}

impl AiManager {
    pub fn new(bus: EventBus) -> Self {
        Self::with_backend(bus, Box::new(OfflineAssistant))
    }

    pub fn with_backend(bus: EventBus, backend: Box<dyn AssistantBackend>) -> Self {
        Self {
            history: Vec::new(),
            awaiting: VecDeque::new(),
            failures: Vec::new(),
            backend,
            bus,
        }
    }

    pub fn set_backend(&mut self, backend: Box<dyn AssistantBackend>) {
        self.backend = backend;
    }

    pub fn generate_code(&mut self, prompt: &str) -> KernelResult<String> {
        self.ask(AssistTask::Generate, prompt)
    }

    pub fn explain_code(&mut self, code: &str) -> KernelResult<String> {
        self.ask(AssistTask::Explain, code)
    }

    pub fn refactor_code(&mut self, code: &str) -> KernelResult<String> {
        self.ask(AssistTask::Refactor, code)
    }

    pub fn debug_code(&mut self, code: &str) -> KernelResult<String> {
        self.ask(AssistTask::Debug, code)
    }

    pub fn optimize_code(&mut self, code: &str) -> KernelResult<String> {
        self.ask(AssistTask::Optimize, code)
    }

    /// Suggests a completion for the text before the cursor.
    pub fn complete(&mut self, prefix: &str) -> KernelResult<String> {
        self.ask(AssistTask::Complete, prefix)
    }

    /// Records the user entry now; the reply arrives through `run_pending`.
    pub fn send_message(&mut self, message: &str) -> KernelResult<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(KernelError::validation("chat message must not be empty"));
        }
        let first = self.history.is_empty() && self.awaiting.is_empty();
        self.history
            .push(ChatMessage::now(ChatRole::User, message.to_string()));
        self.awaiting.push_back(message.to_string());
        if first {
            self.bus.emit(KernelEvent::AiChatStarted);
        }
        Ok(())
    }

    /// Resolves queued replies; returns how many were resolved.
    ///
    /// A failed reply appends nothing to the history and is kept for
    /// `take_failures`.
    pub fn run_pending(&mut self) -> usize {
        let mut resolved = 0;
        while let Some(message) = self.awaiting.pop_front() {
            resolved += 1;
            match self.backend.respond(AssistTask::Chat, &message) {
                Ok(content) => {
                    self.history
                        .push(ChatMessage::now(ChatRole::Assistant, content.clone()));
                    self.bus.emit(KernelEvent::AiMessageReceived { content });
                }
                Err(err) => {
                    warn!("event=ai_reply module=ai status=error error={err}");
                    self.failures.push(KernelError::state(
                        AssistTask::Chat.operation(),
                        format!("assistant failed: {err}"),
                    ));
                }
            }
        }
        resolved
    }

    /// Drains reply failures collected by `run_pending`.
    pub fn take_failures(&mut self) -> Vec<KernelError> {
        std::mem::take(&mut self.failures)
    }

    /// Forgets the conversation; the next message starts a new chat.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.awaiting.clear();
        self.failures.clear();
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn has_pending(&self) -> bool {
        !self.awaiting.is_empty()
    }

    fn ask(&mut self, task: AssistTask, input: &str) -> KernelResult<String> {
        if input.trim().is_empty() {
            return Err(KernelError::validation(format!(
                "{} needs non-empty input",
                task.operation()
            )));
        }
        let reply = self
            .backend
            .respond(task, input)
            .map_err(|err| KernelError::state(task.operation(), format!("assistant failed: {err}")))?;
        debug!(
            "event=ai_request module=ai status=ok operation={} reply_len={}",
            task.operation(),
            reply.len()
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::{AiManager, AssistTask, AssistantBackend, ChatRole};
    use crate::error::KernelError;
    use crate::event::{EventBus, KernelEvent};
use crate::model::file::now_epoch_ms;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Failing;

    impl AssistantBackend for Failing {
        fn respond(&mut self, _task: AssistTask, _input: &str) -> Result<String, String> {
            Err("offline".to_string())
        }
    }

    #[test]
    fn code_operations_are_deterministic() {
        let mut ai = AiManager::new(EventBus::new());
        assert_eq!(
            ai.explain_code("a\nb").expect("explain"),
            "This snippet has 2 line(s) and 3 character(s)."
        );
        assert_eq!(ai.refactor_code("a  \n\n\nb\n\n").expect("refactor"), "a\n\nb");
        assert_eq!(ai.optimize_code("var x = 1;").expect("optimize"), "let x = 1;");
        assert!(ai
            .debug_code("x();\nconsole.log(x);")
            .expect("debug")
            .contains("line 2"));
        assert_eq!(ai.complete("foo.ba").expect("complete"), "ba()");
        assert!(ai.generate_code("sum two numbers").expect("generate").contains("sum two numbers"));
        assert!(matches!(ai.explain_code("  "), Err(KernelError::Validation(_))));
    }

    #[test]
    fn reply_is_deferred_until_pending_work_runs() {
        let bus = EventBus::new();
        let names = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&names);
        bus.on_any(move |event: &KernelEvent| {
            sink.borrow_mut().push(event.name().to_string());
            Ok(())
        });
        let mut ai = AiManager::new(bus);

        ai.send_message("hello").expect("send");
        ai.send_message("again").expect("send");
        assert_eq!(ai.history().len(), 2);
        assert_eq!(*names.borrow(), vec!["ai:chatStarted"]);

        assert_eq!(ai.run_pending(), 2);
        assert!(ai.history().iter().all(|m| m.timestamp_ms > 0));
        assert!(ai.history()[0].timestamp_ms <= ai.history()[3].timestamp_ms);
        let roles: Vec<ChatRole> = ai.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::User, ChatRole::Assistant, ChatRole::Assistant]
        );
        assert_eq!(names.borrow().len(), 3);

        ai.clear_history();
        ai.send_message("fresh").expect("send");
        assert_eq!(
            names.borrow().iter().filter(|n| *n == "ai:chatStarted").count(),
            2
        );
    }

    #[test]
    fn backend_failure_is_a_state_error() {
        let mut ai = AiManager::with_backend(EventBus::new(), Box::new(Failing));
        assert!(matches!(
            ai.generate_code("x"),
            Err(KernelError::State { .. })
        ));
        ai.send_message("hi").expect("send");
        assert_eq!(ai.run_pending(), 1);
        assert_eq!(ai.history().len(), 1);
        assert!(!ai.has_pending());

        let failures = ai.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], KernelError::State { .. }));
        assert!(ai.take_failures().is_empty());
    }
}
