//! Relays collaborator progress checkpoints onto the event bus.

use std::sync::{Arc, Mutex, PoisonError};

use kri_core::collaborator::ProgressSink;
use kri_core::types::{Percent, Stage, MAX_PERCENT};
use kri_events::{EventBus, EventKind};

/// [`ProgressSink`] handed to a collaborator for the duration of one stage.
///
/// Guarantees that what observers receive for the stage is strictly increasing
/// and within `0..=100`: values above 100 are clamped, values at or below the
/// last relayed one are dropped. A stage therefore publishes at most 101
/// progress events, which keeps it well inside the bus capacity.
pub struct ProgressReporter {
    stage: Stage,
    bus: Arc<EventBus>,
    /// Last relayed percentage. Held while publishing so concurrent reports
    /// from one collaborator cannot reorder on the bus.
    last: Mutex<Option<Percent>>,
}

impl ProgressReporter {
    pub fn new(stage: Stage, bus: Arc<EventBus>) -> Self {
        Self {
            stage,
            bus,
            last: Mutex::new(None),
        }
    }

    /// The last percentage relayed to observers, if any.
    pub fn last_relayed(&self) -> Option<Percent> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressSink for ProgressReporter {
    fn report(&self, percent: Percent) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        let percent = if percent > MAX_PERCENT {
            tracing::warn!(stage = %self.stage, percent, "Progress above 100 clamped");
            MAX_PERCENT
        } else {
            percent
        };

        if let Some(previous) = *last {
            if percent == previous {
                return;
            }
            if percent < previous {
                tracing::warn!(
                    stage = %self.stage,
                    percent,
                    previous,
                    "Dropping progress that went backwards",
                );
                return;
            }
        }

        *last = Some(percent);
        self.bus.publish(EventKind::Progress { percent });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
