//! Event logging service.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every received [`OrchestrationEvent`] to the tracing subscriber, so
//! the session log files record each step. It runs as a background task and
//! shuts down when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::{EventKind, OrchestrationEvent};

/// Background service that logs orchestration events.
pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the channel is closed.
    pub async fn run(mut receiver: broadcast::Receiver<OrchestrationEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &OrchestrationEvent) {
        let name = event.kind.name();
        let session_id = event.session_id.to_string();
        match &event.kind {
            EventKind::Progress { percent } => {
                tracing::debug!(event = name, session_id = %session_id, percent, "Stage progress");
            }
            EventKind::StageComplete { stage } => {
                tracing::info!(event = name, session_id = %session_id, stage = %stage, "Stage completed");
            }
            EventKind::StageFailed { stage, error } => {
                tracing::error!(event = name, session_id = %session_id, stage = %stage, error = %error, "Stage failed");
            }
            EventKind::DependentStageReady => {
                tracing::info!(event = name, session_id = %session_id, "Dispatcher may now be started");
            }
        }
    }
}
