//! Interfaces of the external units of work driven by the orchestrator.
//!
//! The orchestrator never knows how reports are generated, how messages are
//! sent or where results are stored. It only drives the three traits below
//! and relays what they report.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::types::{BusinessLine, Percent, ReportPeriod};

/// Error returned by a collaborator. Its message is relayed verbatim in the
/// failure event.
pub type StageFault = Box<dyn std::error::Error + Send + Sync>;

/// Receives the progress checkpoints of a running stage.
pub trait ProgressSink: Send + Sync {
    /// Report that the stage is `percent` complete.
    fn report(&self, percent: Percent);
}

/// A single report produced for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub name: String,
    pub path: PathBuf,
    pub recipient: String,
}

/// State the producer leaves behind for the dispatcher.
///
/// Built from the producer's output on the pipeline worker and handed to the
/// dispatcher on that same worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    pub period: ReportPeriod,
    pub artifacts: Vec<ReportArtifact>,
}

/// Generates the report artifacts for a period.
#[async_trait]
pub trait ArtifactProducer: Send + Sync {
    async fn produce(
        &self,
        period: &ReportPeriod,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ReportArtifact>, StageFault>;
}

/// Distributes the artifacts left in a [`PipelineContext`].
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        context: &PipelineContext,
        progress: &dyn ProgressSink,
    ) -> Result<(), StageFault>;
}

/// Records returned results for one business line. Reports no progress.
#[async_trait]
pub trait TableUpdater: Send + Sync {
    async fn update(&self, selection: BusinessLine) -> Result<(), StageFault>;
}
