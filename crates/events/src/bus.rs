//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`OrchestrationEvent`]s.
//! The runners publish, the presentation layer subscribes. It is shared via
//! `Arc<EventBus>` between the runners of one session.

use chrono::Utc;
use kri_core::event_names::{
    EVENT_DEPENDENT_STAGE_READY, EVENT_PROGRESS, EVENT_STAGE_COMPLETE, EVENT_STAGE_FAILED,
};
use kri_core::types::{Percent, Stage, Timestamp};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// EventKind / OrchestrationEvent
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Completion percentage of the running pipeline stage. Carries no stage
    /// identifier; stage completion events delimit the stages.
    Progress { percent: Percent },

    /// A stage finished successfully.
    StageComplete { stage: Stage },

    /// A stage faulted. No completion event follows for that stage.
    StageFailed { stage: Stage, error: String },

    /// The producer completed and the dispatcher may now be requested.
    DependentStageReady,
}

impl EventKind {
    /// Dot-separated event name, see [`kri_core::event_names`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => EVENT_PROGRESS,
            Self::StageComplete { .. } => EVENT_STAGE_COMPLETE,
            Self::StageFailed { .. } => EVENT_STAGE_FAILED,
            Self::DependentStageReady => EVENT_DEPENDENT_STAGE_READY,
        }
    }
}

/// Envelope published on the bus.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationEvent {
    /// Orchestration session the event belongs to.
    pub session_id: Uuid,

    #[serde(flatten)]
    pub kind: EventKind,

    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl OrchestrationEvent {
    pub fn new(session_id: Uuid, kind: EventKind) -> Self {
        Self {
            session_id,
            kind,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of observers can
/// independently receive every published [`OrchestrationEvent`]. Events from
/// one publisher are received in publication order.
///
/// # Usage
///
/// ```rust
/// use kri_events::bus::{EventBus, EventKind};
///
/// let bus = EventBus::new(16, uuid::Uuid::new_v4());
/// let mut rx = bus.subscribe();
///
/// bus.publish(EventKind::Progress { percent: 10 });
/// ```
pub struct EventBus {
    session_id: Uuid,
    sender: broadcast::Sender<OrchestrationEvent>,
}

impl EventBus {
    /// Create a bus for one session with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize, session_id: Uuid) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { session_id, sender }
    }

    /// Create a bus with the default capacity.
    pub fn for_session(session_id: Uuid) -> Self {
        Self::new(DEFAULT_CAPACITY, session_id)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is dropped.
    pub fn publish(&self, kind: EventKind) {
        // Ignore the SendError, it only means there are zero receivers.
        let _ = self
            .sender
            .send(OrchestrationEvent::new(self.session_id, kind));
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.sender.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
