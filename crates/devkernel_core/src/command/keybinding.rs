//! Key chord -> command mapping.
//!
//! # Responsibility
//! - Parse and normalize chords (`ctrl+s` and `Ctrl+S` are the same chord).
//! - Keep every binding for a chord in registration order.
//!
//! # Invariants
//! - A chord may map to several commands; resolution picks the first binding
//!   whose guard passes.

use crate::command::registry::CommandGuard;
use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::kernel::KernelContext;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use std::str::FromStr;

/// Bindings loaded by `Kernel::initialize`.
pub const DEFAULT_KEYBINDINGS: &[(&str, &str)] = &[
    ("Ctrl+N", "file.new"),
    ("Ctrl+S", "file.save"),
    ("Ctrl+Space", "editor.action.triggerSuggest"),
    ("F5", "debugger.start"),
    ("Shift+F5", "debugger.stop"),
    ("F10", "debugger.stepOver"),
    ("F11", "debugger.stepInto"),
    ("Shift+F11", "debugger.stepOut"),
];

/// Normalized key chord.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    /// Base key, e.g. `S`, `F5`, `Space`.
    pub key: String,
}

impl KeyChord {
    pub fn parse(value: &str) -> KernelResult<Self> {
        let mut chord = KeyChord {
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
            key: String::new(),
        };

        let parts: Vec<&str> = value.split('+').map(str::trim).collect();
        let Some((key, modifiers)) = parts.split_last() else {
            return Err(KernelError::validation("key chord must not be empty"));
        };
        for modifier in modifiers {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "alt" | "option" => chord.alt = true,
                "shift" => chord.shift = true,
                "meta" | "cmd" | "super" => chord.meta = true,
                other => {
                    return Err(KernelError::validation(format!(
                        "unknown key modifier `{other}` in `{value}`"
                    )))
                }
            }
        }

        chord.key = normalize_key(key)
            .ok_or_else(|| KernelError::validation(format!("key chord has no key: `{value}`")))?;
        Ok(chord)
    }
}

impl FromStr for KeyChord {
    type Err = KernelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Display for KeyChord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (enabled, label) in [
            (self.ctrl, "Ctrl+"),
            (self.alt, "Alt+"),
            (self.shift, "Shift+"),
            (self.meta, "Meta+"),
        ] {
            if enabled {
                f.write_str(label)?;
            }
        }
        f.write_str(&self.key)
    }
}

fn normalize_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let mut chars = raw.chars();
    let first = chars.next()?;
    if chars.as_str().is_empty() {
        return Some(first.to_uppercase().collect());
    }
    let mut key: String = first.to_uppercase().collect();
    key.push_str(&chars.as_str().to_ascii_lowercase());
    Some(key)
}

/// One chord -> command binding.
#[derive(Clone)]
pub struct Keybinding {
    pub key: KeyChord,
    pub command: String,
    /// Plugin that contributed the binding, `None` for kernel defaults.
    pub source: Option<String>,
    guard: Option<CommandGuard>,
}

impl Keybinding {
    pub fn new(key: &str, command: impl Into<String>) -> KernelResult<Self> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(KernelError::validation("keybinding command must not be empty"));
        }
        Ok(Self {
            key: KeyChord::parse(key)?,
            command: command.trim().to_string(),
            source: None,
            guard: None,
        })
    }

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

    fn applies(&self, ctx: &KernelContext) -> bool {
        self.guard.as_ref().map_or(true, |guard| guard(ctx))
    }
}

impl Debug for Keybinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keybinding")
            .field("key", &self.key.to_string())
            .field("command", &self.command)
            .field("source", &self.source)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Chord -> ordered bindings registry.
pub struct KeybindingRegistry {
    bindings: BTreeMap<KeyChord, Vec<Keybinding>>,
    bus: EventBus,
}

impl KeybindingRegistry {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bindings: BTreeMap::new(),
            bus,
        }
    }

    /// Appends a binding to its chord's list.
    pub fn register(&mut self, binding: Keybinding) {
        let key = binding.key.to_string();
        let command_id = binding.command.clone();
        self.bindings
            .entry(binding.key.clone())
            .or_default()
            .push(binding);
        self.bus
            .emit(KernelEvent::KeybindingRegistered { key, command_id });
    }

    /// Registers [`DEFAULT_KEYBINDINGS`].
    pub fn register_defaults(&mut self) -> KernelResult<()> {
        for (key, command) in DEFAULT_KEYBINDINGS {
            self.register(Keybinding::new(key, *command)?);
        }
        Ok(())
    }

    /// Bindings for a chord in registration order.
    pub fn bindings_for(&self, chord: &KeyChord) -> &[Keybinding] {
        self.bindings
            .get(chord)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First command bound to `chord` whose guard passes.
    pub fn resolve(&self, chord: &KeyChord, ctx: &KernelContext) -> Option<String> {
        self.bindings_for(chord)
            .iter()
            .find(|binding| binding.applies(ctx))
            .map(|binding| binding.command.clone())
    }

    /// Chords bound to `command`, in chord order.
    pub fn keys_for_command(&self, command: &str) -> Vec<KeyChord> {
        self.bindings
            .iter()
            .filter(|(_, list)| list.iter().any(|binding| binding.command == command))
            .map(|(chord, _)| chord.clone())
            .collect()
    }

    /// Removes every binding contributed by `source`; returns how many were removed.
    pub fn unregister_by_source(&mut self, source: &str) -> usize {
        let mut removed = 0;
        for list in self.bindings.values_mut() {
            let before = list.len();
            list.retain(|binding| binding.source.as_deref() != Some(source));
            removed += before - list.len();
        }
        self.bindings.retain(|_, list| !list.is_empty());
        removed
    }

    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyChord, Keybinding, KeybindingRegistry, DEFAULT_KEYBINDINGS};
    use crate::event::EventBus;

    #[test]
    fn parses_and_normalizes_chords() {
        let chord = KeyChord::parse("shift+ctrl+s").expect("parse");
        assert!(chord.ctrl && chord.shift && !chord.alt);
        assert_eq!(chord.to_string(), "Ctrl+Shift+S");
        assert_eq!(KeyChord::parse("f5").expect("f5").to_string(), "F5");
        assert_eq!(
            KeyChord::parse("Ctrl+space").expect("space").to_string(),
            "Ctrl+Space"
        );
        assert_eq!(
            KeyChord::parse("Ctrl+S").expect("a"),
            KeyChord::parse("control + s").expect("b")
        );
    }

    #[test]
    fn rejects_bad_chords() {
        assert!(KeyChord::parse("").is_err());
        assert!(KeyChord::parse("Ctrl+").is_err());
        assert!(KeyChord::parse("Hyper+K").is_err());
    }

    #[test]
    fn chord_keeps_all_bindings_in_order() {
        let mut registry = KeybindingRegistry::new(EventBus::new());
        registry.register(Keybinding::new("Ctrl+K", "first").expect("first"));
        registry.register(
            Keybinding::new("ctrl+k", "second")
                .expect("second")
                .with_source("plugin.x"),
        );

        let chord = KeyChord::parse("Ctrl+K").expect("chord");
        let commands: Vec<&str> = registry
            .bindings_for(&chord)
            .iter()
            .map(|binding| binding.command.as_str())
            .collect();
        assert_eq!(commands, vec!["first", "second"]);

        assert_eq!(registry.unregister_by_source("plugin.x"), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn default_table_registers_every_entry() {
        let mut registry = KeybindingRegistry::new(EventBus::new());
        registry.register_defaults().expect("defaults");
        assert_eq!(registry.len(), DEFAULT_KEYBINDINGS.len());
        let keys = registry.keys_for_command("debugger.stepOut");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].to_string(), "Shift+F11");
    }
}
