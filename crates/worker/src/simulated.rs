//! Stand-in collaborators that spend simulated effort and report progress.
//!
//! Used by the headless worker to exercise a full orchestration session
//! without real report templates, a mail relay or a results table.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use kri_core::collaborator::{
    ArtifactProducer, Dispatcher, PipelineContext, ProgressSink, ReportArtifact, StageFault,
    TableUpdater,
};
use kri_core::types::{BusinessLine, Percent, ReportPeriod, Stage, MAX_PERCENT};

use crate::config::SimulationConfig;

/// Percentage after `done` of `total` items.
fn percent_of(done: usize, total: usize) -> Percent {
    if total == 0 {
        return MAX_PERCENT;
    }
    ((done * MAX_PERCENT as usize) / total) as Percent
}

fn forced_fault(stage: Stage) -> StageFault {
    format!("simulated {stage} fault").into()
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

pub struct SimulatedProducer {
    report_count: usize,
    step: Duration,
    fail: bool,
}

impl SimulatedProducer {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            report_count: config.report_count,
            step: config.step,
            fail: config.fail_stage == Some(Stage::Producer),
        }
    }
}

#[async_trait]
impl ArtifactProducer for SimulatedProducer {
    async fn produce(
        &self,
        period: &ReportPeriod,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ReportArtifact>, StageFault> {
        let mut artifacts = Vec::with_capacity(self.report_count);
        progress.report(0);

        for i in 0..self.report_count {
            tokio::time::sleep(self.step).await;
            if self.fail && i + 1 == self.report_count.div_ceil(2) {
                return Err(forced_fault(Stage::Producer));
            }

            let name = format!("KRI_{}_{:02}", period.label(), i + 1);
            tracing::debug!(report = %name, "Report generated");
            artifacts.push(ReportArtifact {
                path: PathBuf::from("reports").join(format!("{name}.xlsx")),
                recipient: format!("kri-owner-{:02}@example.com", i + 1),
                name,
            });
            progress.report(percent_of(i + 1, self.report_count));
        }

        if self.report_count == 0 {
            progress.report(MAX_PERCENT);
        }
        Ok(artifacts)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct SimulatedDispatcher {
    step: Duration,
    fail: bool,
}

impl SimulatedDispatcher {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            step: config.step,
            fail: config.fail_stage == Some(Stage::Dispatcher),
        }
    }
}

#[async_trait]
impl Dispatcher for SimulatedDispatcher {
    async fn dispatch(
        &self,
        context: &PipelineContext,
        progress: &dyn ProgressSink,
    ) -> Result<(), StageFault> {
        let total = context.artifacts.len();
        progress.report(0);

        if self.fail {
            tokio::time::sleep(self.step).await;
            return Err(forced_fault(Stage::Dispatcher));
        }

        for (i, artifact) in context.artifacts.iter().enumerate() {
            tokio::time::sleep(self.step).await;
            tracing::info!(
                report = %artifact.name,
                recipient = %artifact.recipient,
                deadline = %context.period.deadline,
                "Report sent",
            );
            progress.report(percent_of(i + 1, total));
        }

        if total == 0 {
            progress.report(MAX_PERCENT);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Table updater
// ---------------------------------------------------------------------------

pub struct SimulatedTableUpdater {
    step: Duration,
    fail: bool,
}

impl SimulatedTableUpdater {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            step: config.step,
            fail: config.fail_stage == Some(Stage::TableUpdater),
        }
    }
}

#[async_trait]
impl TableUpdater for SimulatedTableUpdater {
    async fn update(&self, selection: BusinessLine) -> Result<(), StageFault> {
        tokio::time::sleep(self.step).await;
        if self.fail {
            return Err(forced_fault(Stage::TableUpdater));
        }
        tracing::info!(selection = %selection, "KRI table updated");
        Ok(())
    }
}
