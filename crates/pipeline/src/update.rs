//! Update task runner: one table update per request.
//!
//! Independent of the pipeline runner. Its selection is validated on the
//! calling path; the update itself runs on its own worker and reports a
//! single completion (or failure) event.

use std::sync::Arc;

use kri_core::collaborator::TableUpdater;
use kri_core::error::OrchestrationError;
use kri_core::types::{BusinessLine, Stage, UpdateState};
use kri_events::{EventBus, EventKind};
use tokio::sync::watch;

use crate::execution::{execute_stage, failure_detail, runtime_handle};

/// Runs the table updater for a caller-chosen business line.
///
/// Accepts a new request from `Idle` or `Done`. A request while an update is
/// running is rejected; a failed update returns the runner to `Idle`.
pub struct UpdateTaskRunner {
    updater: Arc<dyn TableUpdater>,
    bus: Arc<EventBus>,
    state: Arc<watch::Sender<UpdateState>>,
}

impl UpdateTaskRunner {
    pub fn new(updater: Arc<dyn TableUpdater>, bus: Arc<EventBus>) -> Self {
        let (state, _) = watch::channel(UpdateState::Idle);
        Self {
            updater,
            bus,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> UpdateState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    /// Parse `selection` and start the update without waiting for it.
    ///
    /// A blank or unknown selection fails with `InvalidArgument` before any
    /// work is scheduled.
    pub fn start(&self, selection: &str) -> Result<(), OrchestrationError> {
        let selection = selection.parse::<BusinessLine>().inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected table update request");
        })?;
        self.start_with(selection)
    }

    /// Start the update for an already parsed selection.
    pub fn start_with(&self, selection: BusinessLine) -> Result<(), OrchestrationError> {
        let runtime = runtime_handle()?;

        let mut actual = UpdateState::Idle;
        let started = self.state.send_if_modified(|state| match state {
            UpdateState::Idle | UpdateState::Done(_) => {
                *state = UpdateState::Running(selection);
                true
            }
            UpdateState::Running(_) => {
                actual = *state;
                false
            }
        });
        if !started {
            tracing::warn!(state = %actual, "Rejected table update request");
            return Err(OrchestrationError::invalid_transition(
                actual,
                "start table update",
            ));
        }

        let worker = UpdateWorker {
            updater: Arc::clone(&self.updater),
            bus: Arc::clone(&self.bus),
            state: Arc::clone(&self.state),
        };
        runtime.spawn(worker.run(selection));

        tracing::info!(selection = %selection, "Table update started");
        Ok(())
    }
}

struct UpdateWorker {
    updater: Arc<dyn TableUpdater>,
    bus: Arc<EventBus>,
    state: Arc<watch::Sender<UpdateState>>,
}

impl UpdateWorker {
    async fn run(self, selection: BusinessLine) {
        match execute_stage(Stage::TableUpdater, self.updater.update(selection)).await {
            Ok(()) => {
                tracing::info!(selection = %selection, "Table update completed");
                self.state.send_replace(UpdateState::Done(selection));
                self.bus.publish(EventKind::StageComplete {
                    stage: Stage::TableUpdater,
                });
            }
            Err(err) => {
                tracing::error!(selection = %selection, error = %err, "Table update failed");
                self.state.send_replace(UpdateState::Idle);
                self.bus.publish(EventKind::StageFailed {
                    stage: Stage::TableUpdater,
                    error: failure_detail(&err),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use kri_core::collaborator::StageFault;
    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    struct CountingUpdater {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TableUpdater for CountingUpdater {
        async fn update(&self, _selection: BusinessLine) -> Result<(), StageFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn runner_with(updater: Arc<CountingUpdater>) -> UpdateTaskRunner {
        UpdateTaskRunner::new(updater, Arc::new(EventBus::for_session(Uuid::new_v4())))
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_before_any_work() {
        let updater = Arc::new(CountingUpdater::default());
        let runner = runner_with(Arc::clone(&updater));

        assert_matches!(runner.start(""), Err(OrchestrationError::InvalidArgument(_)));
        assert_matches!(
            runner.start("Business Line 42"),
            Err(OrchestrationError::InvalidArgument(_))
        );

        tokio::task::yield_now().await;
        assert_eq!(runner.state(), UpdateState::Idle);
        assert_eq!(updater.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn captures_selection_at_start() {
        let runner = runner_with(Arc::new(CountingUpdater::default()));
        runner.start("Business Line 3").unwrap();
        assert_eq!(runner.state().selection(), Some(BusinessLine::Three));
    }

    #[tokio::test]
    async fn can_run_again_after_completion() {
        let updater = Arc::new(CountingUpdater::default());
        let runner = runner_with(Arc::clone(&updater));
        let mut state = runner.watch_state();

        runner.start("Business Line 1").unwrap();
        state
            .wait_for(|s| matches!(s, UpdateState::Done(_)))
            .await
            .unwrap();

        runner.start("Business Line 2").unwrap();
        state
            .wait_for(|s| *s == UpdateState::Done(BusinessLine::Two))
            .await
            .unwrap();

        assert_eq!(updater.calls.load(Ordering::SeqCst), 2);
    }
}
