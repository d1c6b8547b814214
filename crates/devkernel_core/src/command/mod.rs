//! Command and keybinding registries.
//!
//! # Responsibility
//! - Map command ids to handlers and key chords to command ids.
//! - Keep both registries free of manager state; handlers receive the
//!   kernel context explicitly.

pub mod keybinding;
pub mod registry;

pub use keybinding::{KeyChord, Keybinding, KeybindingRegistry, DEFAULT_KEYBINDINGS};
pub use registry::{
    parse_args, Command, CommandArgs, CommandGuard, CommandHandler, CommandOutcome, CommandRegistry,
};
