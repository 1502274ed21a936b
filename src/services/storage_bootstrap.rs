//! Picks the persistence backend at startup.
//!
//! A configured durable backend must answer within a bounded number of attempts. When it does
//! not, the process runs on the memory store until it exits and `/healthcheck` reports
//! `degraded`; the durable backend is not retried later.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    config::StorageSettings,
    dao::party_store::{PartyStore, memory::MemoryPartyStore},
    state::{StorageKind, StorageStatus},
};

const CONNECT_ATTEMPTS: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_millis(250);
const MAX_DELAY: Duration = Duration::from_secs(5);

/// Connect to the configured backend, or fall back to memory for the rest of the process.
pub async fn connect_or_fallback(
    settings: &StorageSettings,
) -> (Arc<dyn PartyStore>, StorageStatus) {
    match connect(settings).await {
        Some((store, kind)) => {
            info!(backend = ?kind, "storage backend ready");
            (store, StorageStatus::healthy(kind))
        }
        None => {
            warn!("durable storage unreachable; running on the in-memory store (degraded)");
            let store: Arc<dyn PartyStore> = Arc::new(MemoryPartyStore::new());
            (store, StorageStatus::fallback())
        }
    }
}

async fn connect(settings: &StorageSettings) -> Option<(Arc<dyn PartyStore>, StorageKind)> {
    match settings {
        StorageSettings::Memory => {
            info!("no durable storage configured; using the in-memory store");
            let store: Arc<dyn PartyStore> = Arc::new(MemoryPartyStore::new());
            Some((store, StorageKind::Memory))
        }
        StorageSettings::Mongo { uri, database } => connect_mongo(uri, database.as_deref()).await,
        StorageSettings::Couch {
            base_url,
            database,
            credentials,
        } => connect_couch(base_url, database, credentials.clone()).await,
    }
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(
    uri: &str,
    database: Option<&str>,
) -> Option<(Arc<dyn PartyStore>, StorageKind)> {
    use crate::dao::party_store::mongodb::{MongoConfig, MongoPartyStore};

    let config = match MongoConfig::from_uri(uri, database).await {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "invalid MongoDB configuration");
            return None;
        }
    };
    // The driver connection already retries its initial ping.
    match MongoPartyStore::connect(config).await {
        Ok(store) => {
            let store: Arc<dyn PartyStore> = Arc::new(store);
            Some((store, StorageKind::Mongo))
        }
        Err(err) => {
            warn!(error = %err, "failed to connect to MongoDB");
            None
        }
    }
}

#[cfg(not(feature = "mongo-store"))]
async fn connect_mongo(
    _uri: &str,
    _database: Option<&str>,
) -> Option<(Arc<dyn PartyStore>, StorageKind)> {
    warn!("MongoDB storage requested but the `mongo-store` feature is disabled");
    None
}

#[cfg(feature = "couch-store")]
async fn connect_couch(
    base_url: &str,
    database: &str,
    credentials: Option<(String, String)>,
) -> Option<(Arc<dyn PartyStore>, StorageKind)> {
    use crate::dao::party_store::couchdb::{CouchConfig, CouchPartyStore};

    let mut config = CouchConfig::new(base_url, database);
    if let Some((username, password)) = credentials {
        config = config.with_credentials(username, password);
    }

    let store = with_retries("CouchDB", || CouchPartyStore::connect(config.clone())).await?;
    let store: Arc<dyn PartyStore> = Arc::new(store);
    Some((store, StorageKind::Couch))
}

#[cfg(not(feature = "couch-store"))]
async fn connect_couch(
    _base_url: &str,
    _database: &str,
    _credentials: Option<(String, String)>,
) -> Option<(Arc<dyn PartyStore>, StorageKind)> {
    warn!("CouchDB storage requested but the `couch-store` feature is disabled");
    None
}

/// Run `attempt` up to [`CONNECT_ATTEMPTS`] times with doubling delays.
async fn with_retries<T, E, F, Fut>(backend: &str, mut attempt: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = INITIAL_DELAY;
    for attempts in 1..=CONNECT_ATTEMPTS {
        match attempt().await {
            Ok(value) => return Some(value),
            Err(err) if attempts == CONNECT_ATTEMPTS => {
                warn!(backend, attempts, error = %err, "giving up on storage connection");
            }
            Err(err) => {
                warn!(
                    backend,
                    attempts,
                    wait_ms = delay.as_millis() as u64,
                    error = %err,
                    "storage connection failed; retrying"
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
    None
}
