use std::sync::Arc;

use tracing::{error, info};

use crate::transport::{CloseSummary, TransportRegistry};

/// Resolves on the first interrupt, after every live transport has been
/// closed. Meant for `axum::serve(..).with_graceful_shutdown(..)`.
pub async fn signal(registry: Arc<TransportRegistry>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for interrupt signal");
        std::future::pending::<()>().await;
    }

    close_transports(&registry).await;
}

pub async fn close_transports(registry: &TransportRegistry) -> CloseSummary {
    info!(transports = registry.len(), "shutting down server");
    let summary = registry.close_all().await;
    info!(
        attempted = summary.attempted,
        failed = summary.failed,
        "server shutdown complete"
    );
    summary
}
