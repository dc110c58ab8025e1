//! Scripted collaborators and event helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use kri_core::collaborator::{
    ArtifactProducer, Dispatcher, PipelineContext, ProgressSink, ReportArtifact, StageFault,
    TableUpdater,
};
use kri_core::types::{BusinessLine, Percent, ReportPeriod};
use kri_events::{EventKind, OrchestrationEvent};
use kri_pipeline::Orchestrator;
use tokio::sync::{broadcast, Notify};

/// Upper bound for any single wait in the tests.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn period() -> ReportPeriod {
    ReportPeriod::new(2026, 3, NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Reports a fixed list of checkpoints, optionally faulting after the
/// checkpoint at `fail_after`, optionally waiting on `release` first.
#[derive(Default)]
pub struct ScriptedProducer {
    pub checkpoints: Vec<Percent>,
    pub fail_after: Option<usize>,
    pub panic: bool,
    pub release: Option<Arc<Notify>>,
    pub artifact_count: usize,
    pub calls: AtomicUsize,
}

impl ScriptedProducer {
    pub fn reporting(checkpoints: &[Percent]) -> Self {
        Self {
            checkpoints: checkpoints.to_vec(),
            artifact_count: 3,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ArtifactProducer for ScriptedProducer {
    async fn produce(
        &self,
        period: &ReportPeriod,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ReportArtifact>, StageFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(release) = &self.release {
            release.notified().await;
        }
        if self.panic {
            panic!("producer crashed");
        }

        for (i, percent) in self.checkpoints.iter().enumerate() {
            progress.report(*percent);
            tokio::task::yield_now().await;
            if self.fail_after == Some(i) {
                return Err("template workbook missing".into());
            }
        }

        Ok((0..self.artifact_count)
            .map(|i| ReportArtifact {
                name: format!("KRI {} #{i}", period.label()),
                path: PathBuf::from(format!("reports/{i}.xlsx")),
                recipient: format!("owner{i}@example.com"),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Reports a fixed list of checkpoints and records the context it received.
#[derive(Default)]
pub struct ScriptedDispatcher {
    pub checkpoints: Vec<Percent>,
    pub fail: bool,
    pub received: Mutex<Option<PipelineContext>>,
    pub calls: AtomicUsize,
}

impl ScriptedDispatcher {
    pub fn reporting(checkpoints: &[Percent]) -> Self {
        Self {
            checkpoints: checkpoints.to_vec(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Dispatcher for ScriptedDispatcher {
    async fn dispatch(
        &self,
        context: &PipelineContext,
        progress: &dyn ProgressSink,
    ) -> Result<(), StageFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.received.lock().unwrap() = Some(context.clone());
        for percent in &self.checkpoints {
            progress.report(*percent);
            tokio::task::yield_now().await;
        }
        if self.fail {
            return Err("mail relay refused connection".into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Table updater
// ---------------------------------------------------------------------------

/// Records every selection it is asked to update, optionally waiting on
/// `release` before finishing.
#[derive(Default)]
pub struct RecordingUpdater {
    pub selections: Mutex<Vec<BusinessLine>>,
    pub fail: bool,
    pub release: Option<Arc<Notify>>,
}

#[async_trait]
impl TableUpdater for RecordingUpdater {
    async fn update(&self, selection: BusinessLine) -> Result<(), StageFault> {
        self.selections.lock().unwrap().push(selection);
        if let Some(release) = &self.release {
            release.notified().await;
        }
        if self.fail {
            return Err("results file not found".into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub events: broadcast::Receiver<OrchestrationEvent>,
    pub producer: Arc<ScriptedProducer>,
    pub dispatcher: Arc<ScriptedDispatcher>,
    pub updater: Arc<RecordingUpdater>,
}

impl Harness {
    pub fn new(
        producer: ScriptedProducer,
        dispatcher: ScriptedDispatcher,
        updater: RecordingUpdater,
    ) -> Self {
        let producer = Arc::new(producer);
        let dispatcher = Arc::new(dispatcher);
        let updater = Arc::new(updater);
        let orchestrator = Orchestrator::new(
            period(),
            Arc::clone(&producer) as Arc<dyn ArtifactProducer>,
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
            Arc::clone(&updater) as Arc<dyn TableUpdater>,
        );
        let events = orchestrator.subscribe();
        Self {
            orchestrator,
            events,
            producer,
            dispatcher,
            updater,
        }
    }

    /// Receive the next event, failing the test if none arrives in time.
    pub async fn next_event(&mut self) -> EventKind {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event bus closed or lagged")
            .kind
    }

    /// Receive events up to and including the first one matching `last`.
    pub async fn events_until(&mut self, last: impl Fn(&EventKind) -> bool) -> Vec<EventKind> {
        let mut seen = Vec::new();
        loop {
            let event = self.next_event().await;
            let done = last(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    /// Give spawned workers a chance to run, then assert nothing was published.
    pub async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(
            matches!(
                self.events.try_recv(),
                Err(broadcast::error::TryRecvError::Empty)
            ),
            "expected no further events"
        );
    }
}

/// Progress values in `events`, in order.
pub fn progress_values(events: &[EventKind]) -> Vec<Percent> {
    events
        .iter()
        .filter_map(|e| match e {
            EventKind::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect()
}
