//! Orchestration event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`OrchestrationEvent`]: the event envelope observers receive.
//! - [`EventLogger`]: background subscriber that logs every event.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, EventKind, OrchestrationEvent};
pub use logger::EventLogger;
