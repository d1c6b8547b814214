//! Domain managers.
//!
//! # Responsibility
//! - Each manager is the sole mutator of its own collections.
//! - Managers share only the event bus; they never hold references to each other.

pub mod ai;
pub mod collaboration;
pub mod debugger;
pub mod editor;
pub mod performance;
pub mod search;
pub mod terminal;
pub mod workspace;
