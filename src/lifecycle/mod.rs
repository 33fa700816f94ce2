//! Process lifecycle: shutdown and webhook-driven restarts.

pub mod restart;

pub use restart::{restart_process, RestartError};

/// Resolves when the process receives Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
