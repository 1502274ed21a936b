use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the storage selected at startup, logging if it stopped answering since.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Err(err) = state.store().health_check().await {
        warn!(error = %err, "storage health check failed");
    }
    HealthResponse::from_status(state.storage())
}
