use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::{StorageKind, StorageStatus};

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Backend serving requests ("mongo", "couch" or "memory").
    pub storage: String,
}

impl HealthResponse {
    /// Build the response for the storage selected at startup.
    pub fn from_status(status: StorageStatus) -> Self {
        let storage = match status.backend {
            StorageKind::Mongo => "mongo",
            StorageKind::Couch => "couch",
            StorageKind::Memory => "memory",
        };
        Self {
            status: if status.degraded { "degraded" } else { "ok" }.to_string(),
            storage: storage.to_string(),
        }
    }
}
