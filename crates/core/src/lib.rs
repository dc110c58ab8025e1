//! Core domain types for the KRI reporting orchestrator.
//!
//! Holds everything the other crates agree on: stages, selections, the
//! reporting period, execution states, the error type and the traits the
//! external collaborators implement. Contains no runtime logic.

pub mod collaborator;
pub mod error;
pub mod event_names;
pub mod types;

pub use collaborator::{
    ArtifactProducer, Dispatcher, PipelineContext, ProgressSink, ReportArtifact, StageFault,
    TableUpdater,
};
pub use error::OrchestrationError;
pub use types::{BusinessLine, Percent, PipelineState, ReportPeriod, Stage, UpdateState};
