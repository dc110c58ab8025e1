use crate::types::Stage;

/// Errors raised by the orchestration layer.
///
/// `InvalidStateTransition` and `InvalidArgument` are returned synchronously
/// from the request methods, before any worker is spawned.
/// `StageExecutionFailure` is produced on a worker and surfaced to observers
/// as a failure event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Invalid state transition: cannot {action} while {state}")]
    InvalidStateTransition { state: String, action: &'static str },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Stage {stage} failed: {message}")]
    StageExecutionFailure { stage: Stage, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestrationError {
    pub fn invalid_transition(state: impl std::fmt::Display, action: &'static str) -> Self {
        Self::InvalidStateTransition {
            state: state.to_string(),
            action,
        }
    }
}
