//! Task orchestration for the KRI reporting workflow.
//!
//! - [`PrimaryPipelineRunner`]: producer then dispatcher, gated, on one worker.
//! - [`UpdateTaskRunner`]: independent table updates.
//! - [`Orchestrator`]: the facade the presentation layer talks to.
//!
//! Request methods never block. They validate synchronously, spawn work onto
//! the current Tokio runtime and report back through the event bus.

mod execution;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod update;

pub use orchestrator::{Orchestrator, TriggerAvailability};
pub use progress::ProgressReporter;
pub use runner::PrimaryPipelineRunner;
pub use update::UpdateTaskRunner;
