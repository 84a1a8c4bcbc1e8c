//! OS signal handling.
//!
//! # Responsibilities
//! - Resolve when the user interrupts the process (SIGINT / Ctrl-C)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Raced against the whole transfer flow, not just input reads
//! - Once installed the handler replaces the default SIGINT action, so
//!   it must stay polled until the flow ends

/// Wait for Ctrl-C.
///
/// If the handler cannot be installed the future never resolves and the
/// default SIGINT action stays in place.
pub async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::debug!("Ctrl-C received");
}
