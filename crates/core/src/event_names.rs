//! Event name constants for orchestration events.
//!
//! Used as the `event_type` of serialized events and as the `event` field of
//! log records, so the presentation layer and the log files agree.

/// Progress checkpoint of the running pipeline stage.
pub const EVENT_PROGRESS: &str = "stage.progress";

/// A stage finished successfully.
pub const EVENT_STAGE_COMPLETE: &str = "stage.complete";

/// A stage faulted. Mutually exclusive with [`EVENT_STAGE_COMPLETE`].
pub const EVENT_STAGE_FAILED: &str = "stage.failed";

/// The dispatcher may now be requested.
pub const EVENT_DEPENDENT_STAGE_READY: &str = "pipeline.dependent_stage_ready";
