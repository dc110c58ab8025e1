//! Headless driver for one orchestration session.
//!
//! Plays the operator: requests generation, requests dispatch as soon as the
//! gate opens, optionally runs a table update alongside, and returns once
//! every requested stage has finished.

use std::sync::Arc;

use kri_core::error::OrchestrationError;
use kri_core::types::{BusinessLine, PipelineState, Stage, UpdateState};
use kri_events::{EventKind, EventLogger};
use kri_pipeline::Orchestrator;
use tokio::sync::broadcast::error::RecvError;

use crate::config::WorkerConfig;
use crate::simulated::{SimulatedDispatcher, SimulatedProducer, SimulatedTableUpdater};

/// Build an orchestrator wired to the simulated collaborators.
pub fn build_orchestrator(config: &WorkerConfig) -> Orchestrator {
    Orchestrator::new(
        config.period,
        Arc::new(SimulatedProducer::new(&config.simulation)),
        Arc::new(SimulatedDispatcher::new(&config.simulation)),
        Arc::new(SimulatedTableUpdater::new(&config.simulation)),
    )
}

/// Run the full workflow and return the first stage failure, if any.
pub async fn run_session(
    orchestrator: &Orchestrator,
    business_line: Option<BusinessLine>,
) -> Result<(), OrchestrationError> {
    let mut events = orchestrator.subscribe();
    tokio::spawn(EventLogger::run(orchestrator.subscribe()));

    orchestrator.request_generate()?;
    if let Some(line) = business_line {
        orchestrator.request_update(line.label())?;
    }

    let mut pipeline_done = false;
    let mut update_done = business_line.is_none();

    while !(pipeline_done && update_done) {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(n)) => {
                // Progress is capped per stage, so only a stalled driver gets here.
                tracing::warn!(skipped = n, "Session driver lagged behind the event bus");
                let progress = resync(orchestrator)?;
                pipeline_done |= progress.pipeline_done;
                update_done |= progress.update_done;
                continue;
            }
            Err(RecvError::Closed) => {
                return Err(OrchestrationError::Internal("event bus closed".into()));
            }
        };

        match event.kind {
            EventKind::Progress { .. } => {}
            EventKind::DependentStageReady => dispatch_if_ready(orchestrator)?,
            EventKind::StageComplete { stage } => match stage {
                Stage::Producer => {}
                Stage::Dispatcher => pipeline_done = true,
                Stage::TableUpdater => update_done = true,
            },
            EventKind::StageFailed { stage, error } => {
                return Err(OrchestrationError::StageExecutionFailure {
                    stage,
                    message: error,
                });
            }
        }
    }

    tracing::info!(
        session_id = %orchestrator.session_id(),
        state = %orchestrator.pipeline_state(),
        "Session finished",
    );
    Ok(())
}

/// What the runner states say has finished, read after missed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Resynced {
    pipeline_done: bool,
    update_done: bool,
}

/// Recover from skipped events by reading the runner states directly.
///
/// A missed gate event still leads to dispatch. A missed failure cannot be
/// recovered this way since a faulted stage keeps its `*Running` state.
fn resync(orchestrator: &Orchestrator) -> Result<Resynced, OrchestrationError> {
    dispatch_if_ready(orchestrator)?;
    Ok(Resynced {
        pipeline_done: orchestrator.pipeline_state() == PipelineState::DispatcherDone,
        update_done: matches!(orchestrator.update_state(), UpdateState::Done(_)),
    })
}

/// Request dispatch only while the gate is open, so a resync followed by the
/// queued gate event does not ask twice.
fn dispatch_if_ready(orchestrator: &Orchestrator) -> Result<(), OrchestrationError> {
    if orchestrator.pipeline_state() == PipelineState::ProducerDone {
        orchestrator.request_dispatch()?;
    }
    Ok(())
}
