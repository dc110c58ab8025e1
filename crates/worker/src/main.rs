use std::process::ExitCode;

use kri_worker::config::WorkerConfig;
use kri_worker::{logging, session};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Tracing + session log files ---
    let log_dir = logging::log_dir_from_env();
    let _log_guards = match logging::init_tracing(&log_dir) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Failed to create log files in {}: {e}", log_dir.display());
            return ExitCode::FAILURE;
        }
    };

    // --- Configuration ---
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        period = %config.period.label(),
        deadline = %config.period.deadline,
        business_line = ?config.business_line.map(|l| l.label()),
        "Loaded worker configuration",
    );

    // --- Session ---
    let orchestrator = session::build_orchestrator(&config);
    match session::run_session(&orchestrator, config.business_line).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Session failed");
            ExitCode::FAILURE
        }
    }
}
