//! Restart after a manifest or entrypoint change.
//!
//! The webhook handler acknowledges the delivery before calling into
//! here, so a restart never loses the delivery on the sender's side.
//! The process exits with a distinct code and relies on its supervisor
//! (systemd, a container runtime) to bring it back up.

use thiserror::Error;
use tokio::process::Command;

/// Exit code a supervisor should treat as "restart me".
pub const RESTART_EXIT_CODE: u8 = 75;

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("install command is empty")]
    EmptyCommand,
    #[error("install command failed to spawn: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("install command exited with status {0}")]
    Failed(std::process::ExitStatus),
}

/// Run the configured install command, if any, then exit the process.
///
/// An install failure is logged but still restarts: stale dependencies
/// with new code beat new dependencies with stale code staying up.
pub async fn restart_process(install_command: Option<&[String]>) -> ! {
    if let Some(command) = install_command {
        if let Err(e) = run_install(command).await {
            tracing::error!(error = %e, "Dependency install failed, restarting anyway");
        }
    }
    tracing::info!(code = RESTART_EXIT_CODE, "Exiting for restart");
    std::process::exit(i32::from(RESTART_EXIT_CODE));
}

async fn run_install(command: &[String]) -> Result<(), RestartError> {
    let (program, args) = command.split_first().ok_or(RestartError::EmptyCommand)?;
    tracing::info!(command = %command.join(" "), "Running install command");

    let status = Command::new(program).args(args).status().await?;
    if !status.success() {
        return Err(RestartError::Failed(status));
    }
    Ok(())
}
