//! Helpers shared by the runners' workers.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use kri_core::collaborator::StageFault;
use kri_core::error::OrchestrationError;
use kri_core::types::Stage;
use tokio::runtime::Handle;

/// Handle of the runtime the caller is on.
///
/// Workers are spawned onto it, so requests issued outside a Tokio runtime
/// are rejected instead of panicking.
pub(crate) fn runtime_handle() -> Result<Handle, OrchestrationError> {
    Handle::try_current().map_err(|e| OrchestrationError::Internal(format!("no async runtime: {e}")))
}

/// Await a collaborator call, turning both returned faults and panics into
/// [`OrchestrationError::StageExecutionFailure`].
pub(crate) async fn execute_stage<T, F>(stage: Stage, call: F) -> Result<T, OrchestrationError>
where
    F: Future<Output = Result<T, StageFault>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(fault)) => Err(OrchestrationError::StageExecutionFailure {
            stage,
            message: fault.to_string(),
        }),
        Err(payload) => Err(OrchestrationError::StageExecutionFailure {
            stage,
            message: format!("panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

/// The human-readable failure detail carried by a failure event.
pub(crate) fn failure_detail(err: &OrchestrationError) -> String {
    match err {
        OrchestrationError::StageExecutionFailure { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
