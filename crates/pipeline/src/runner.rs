//! Primary pipeline runner: producer, then dispatcher.
//!
//! [`PrimaryPipelineRunner::start_producer`] spawns a single worker task that
//! runs the producer, opens the dispatcher gate and then parks until
//! [`PrimaryPipelineRunner::start_dispatcher`] wakes it. The dispatcher runs
//! on that same worker against the [`PipelineContext`] the producer left
//! behind. The two stages never overlap and the runner is single use.
//!
//! A stage fault publishes `StageFailed` and leaves the state at the
//! corresponding `*Running` value, so every later request on this runner is
//! rejected. Recovering requires a fresh runner.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kri_core::collaborator::{ArtifactProducer, Dispatcher, PipelineContext};
use kri_core::error::OrchestrationError;
use kri_core::types::{PipelineState, ReportPeriod, Stage};
use kri_events::{EventBus, EventKind};
use tokio::sync::{oneshot, watch};

use crate::execution::{execute_stage, failure_detail, runtime_handle};
use crate::progress::ProgressReporter;

/// Sequences the producer and dispatcher stages of one session.
pub struct PrimaryPipelineRunner {
    period: ReportPeriod,
    producer: Arc<dyn ArtifactProducer>,
    dispatcher: Arc<dyn Dispatcher>,
    bus: Arc<EventBus>,
    state: Arc<watch::Sender<PipelineState>>,
    /// Wakes the parked worker to run the dispatcher. Set by
    /// `start_producer`, consumed by `start_dispatcher`.
    dispatch_trigger: Mutex<Option<oneshot::Sender<()>>>,
}

impl PrimaryPipelineRunner {
    pub fn new(
        period: ReportPeriod,
        producer: Arc<dyn ArtifactProducer>,
        dispatcher: Arc<dyn Dispatcher>,
        bus: Arc<EventBus>,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            period,
            producer,
            dispatcher,
            bus,
            state: Arc::new(state),
            dispatch_trigger: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Start the producer stage without waiting for it.
    ///
    /// Fails with `InvalidStateTransition` unless the runner is `Idle`.
    pub fn start_producer(&self) -> Result<(), OrchestrationError> {
        let runtime = runtime_handle()?;
        transition(
            &self.state,
            PipelineState::Idle,
            PipelineState::ProducerRunning,
            "start producer",
        )?;

        let (trigger_tx, trigger_rx) = oneshot::channel();
        *self.trigger_slot() = Some(trigger_tx);

        let worker = PipelineWorker {
            period: self.period,
            producer: Arc::clone(&self.producer),
            dispatcher: Arc::clone(&self.dispatcher),
            bus: Arc::clone(&self.bus),
            state: Arc::clone(&self.state),
        };
        runtime.spawn(worker.run(trigger_rx));

        tracing::info!(period = %self.period.label(), "Producer stage started");
        Ok(())
    }

    /// Start the dispatcher stage on the worker that ran the producer.
    ///
    /// Only valid once the producer has completed (`ProducerDone`), which
    /// observers learn through the `DependentStageReady` event.
    pub fn start_dispatcher(&self) -> Result<(), OrchestrationError> {
        transition(
            &self.state,
            PipelineState::ProducerDone,
            PipelineState::DispatcherRunning,
            "start dispatcher",
        )?;

        let woken = match self.trigger_slot().take() {
            Some(trigger) => trigger
                .send(())
                .map_err(|_| "pipeline worker is no longer running"),
            None => Err("dispatch trigger missing"),
        };
        // The state already says `DispatcherRunning`; observers need a terminal event.
        if let Err(reason) = woken {
            tracing::error!(reason, "Dispatcher stage could not be started");
            self.bus.publish(EventKind::StageFailed {
                stage: Stage::Dispatcher,
                error: reason.to_string(),
            });
            return Err(OrchestrationError::Internal(reason.to_string()));
        }

        tracing::info!(period = %self.period.label(), "Dispatcher stage started");
        Ok(())
    }

    fn trigger_slot(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.dispatch_trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Atomically move `state` from `from` to `to`, or report where it actually is.
fn transition(
    state: &watch::Sender<PipelineState>,
    from: PipelineState,
    to: PipelineState,
    action: &'static str,
) -> Result<(), OrchestrationError> {
    let mut actual = from;
    let moved = state.send_if_modified(|current| {
        if *current == from {
            *current = to;
            true
        } else {
            actual = *current;
            false
        }
    });

    if moved {
        Ok(())
    } else {
        tracing::warn!(state = %actual, action, "Rejected pipeline request");
        Err(OrchestrationError::invalid_transition(actual, action))
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// The execution context both stages run on.
struct PipelineWorker {
    period: ReportPeriod,
    producer: Arc<dyn ArtifactProducer>,
    dispatcher: Arc<dyn Dispatcher>,
    bus: Arc<EventBus>,
    state: Arc<watch::Sender<PipelineState>>,
}

impl PipelineWorker {
    async fn run(self, dispatch_trigger: oneshot::Receiver<()>) {
        let Some(context) = self.run_producer().await else {
            return;
        };

        if dispatch_trigger.await.is_err() {
            tracing::debug!("Pipeline runner dropped before the dispatcher was requested");
            return;
        }

        self.run_dispatcher(&context).await;
    }

    async fn run_producer(&self) -> Option<PipelineContext> {
        let progress = ProgressReporter::new(Stage::Producer, Arc::clone(&self.bus));
        let result = execute_stage(
            Stage::Producer,
            self.producer.produce(&self.period, &progress),
        )
        .await;

        match result {
            Ok(artifacts) => {
                tracing::info!(artifacts = artifacts.len(), "Producer stage completed");
                // State first, so a dispatch requested on the ready event is valid.
                self.state.send_replace(PipelineState::ProducerDone);
                self.bus.publish(EventKind::StageComplete {
                    stage: Stage::Producer,
                });
                self.bus.publish(EventKind::DependentStageReady);
                Some(PipelineContext {
                    period: self.period,
                    artifacts,
                })
            }
            Err(err) => {
                self.fail(Stage::Producer, &err);
                None
            }
        }
    }

    async fn run_dispatcher(&self, context: &PipelineContext) {
        let progress = ProgressReporter::new(Stage::Dispatcher, Arc::clone(&self.bus));
        let result = execute_stage(
            Stage::Dispatcher,
            self.dispatcher.dispatch(context, &progress),
        )
        .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    artifacts = context.artifacts.len(),
                    "Dispatcher stage completed"
                );
                self.state.send_replace(PipelineState::DispatcherDone);
                self.bus.publish(EventKind::StageComplete {
                    stage: Stage::Dispatcher,
                });
            }
            Err(err) => self.fail(Stage::Dispatcher, &err),
        }
    }

    fn fail(&self, stage: Stage, err: &OrchestrationError) {
        tracing::error!(stage = %stage, error = %err, "Pipeline stage failed");
        self.bus.publish(EventKind::StageFailed {
            stage,
            error: failure_detail(err),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
