//! Orchestration facade for the presentation layer.
//!
//! [`Orchestrator`] owns one [`PrimaryPipelineRunner`] and one
//! [`UpdateTaskRunner`] for a session, both publishing on the same
//! [`EventBus`]. Its three request methods map 1:1 onto the runners'
//! operations and return their errors unchanged.

use std::sync::Arc;

use kri_core::collaborator::{ArtifactProducer, Dispatcher, TableUpdater};
use kri_core::error::OrchestrationError;
use kri_core::types::{PipelineState, ReportPeriod, UpdateState};
use kri_events::{EventBus, OrchestrationEvent};
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::runner::PrimaryPipelineRunner;
use crate::update::UpdateTaskRunner;

/// Which of the three triggers the presentation layer should enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerAvailability {
    pub generate: bool,
    pub dispatch: bool,
    pub update: bool,
}

impl TriggerAvailability {
    pub fn from_states(pipeline: PipelineState, update: UpdateState) -> Self {
        Self {
            generate: pipeline == PipelineState::Idle,
            dispatch: pipeline == PipelineState::ProducerDone,
            update: !matches!(update, UpdateState::Running(_)),
        }
    }
}

/// One orchestration session.
pub struct Orchestrator {
    bus: Arc<EventBus>,
    pipeline: PrimaryPipelineRunner,
    updater: UpdateTaskRunner,
}

impl Orchestrator {
    pub fn new(
        period: ReportPeriod,
        producer: Arc<dyn ArtifactProducer>,
        dispatcher: Arc<dyn Dispatcher>,
        table_updater: Arc<dyn TableUpdater>,
    ) -> Self {
        let bus = Arc::new(EventBus::for_session(Uuid::new_v4()));
        let pipeline = PrimaryPipelineRunner::new(period, producer, dispatcher, Arc::clone(&bus));
        let updater = UpdateTaskRunner::new(table_updater, Arc::clone(&bus));

        tracing::info!(
            session_id = %bus.session_id(),
            period = %period.label(),
            deadline = %period.deadline,
            "Orchestration session created",
        );

        Self {
            bus,
            pipeline,
            updater,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.bus.session_id()
    }

    /// Subscribe to the events of both runners.
    ///
    /// Only events published after this call are received, so subscribe
    /// before issuing requests.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.bus.subscribe()
    }

    /// Start generating the report artifacts.
    pub fn request_generate(&self) -> Result<(), OrchestrationError> {
        self.pipeline.start_producer()
    }

    /// Start dispatching the generated artifacts.
    pub fn request_dispatch(&self) -> Result<(), OrchestrationError> {
        self.pipeline.start_dispatcher()
    }

    /// Start a table update for the business line labelled `selection`.
    pub fn request_update(&self, selection: &str) -> Result<(), OrchestrationError> {
        self.updater.start(selection)
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline.state()
    }

    pub fn update_state(&self) -> UpdateState {
        self.updater.state()
    }

    pub fn watch_pipeline(&self) -> watch::Receiver<PipelineState> {
        self.pipeline.watch_state()
    }

    pub fn watch_update(&self) -> watch::Receiver<UpdateState> {
        self.updater.watch_state()
    }

    pub fn availability(&self) -> TriggerAvailability {
        TriggerAvailability::from_states(self.pipeline_state(), self.update_state())
    }
}
