//! Event bus and event catalogue.
//!
//! # Responsibility
//! - Decouple managers from each other and from the hosting UI.
//! - Preserve the `category:action` wire names as the external contract.

pub mod bus;
pub mod types;

pub use bus::{EventBus, ListenerId, ListenerResult};
pub use types::KernelEvent;
