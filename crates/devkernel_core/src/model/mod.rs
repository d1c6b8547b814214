//! Kernel domain model.
//!
//! # Responsibility
//! - Define entity records shared by managers and event payloads.
//! - Keep identity types explicit in signatures.
//!
//! # Invariants
//! - Files and folders are keyed by normalized path.
//! - Every other entity is identified by a stable uuid newtype.

pub mod file;
pub mod ids;
pub mod language;
