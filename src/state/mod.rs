/// Time source abstraction.
pub mod clock;
/// Lazy-expiry view of the current round.
pub mod round;

use std::{future::Future, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    dao::party_store::{PartyStore, memory::MemoryPartyStore},
};

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::round::RoundStatus;

/// Handle cloned into every request.
pub type SharedState = Arc<AppState>;

/// Backend actually serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// MongoDB.
    Mongo,
    /// CouchDB.
    Couch,
    /// In-process memory store.
    Memory,
}

/// Storage selected at startup. `degraded` is set when the configured durable backend was
/// unreachable and the process fell back to memory; it never flips back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStatus {
    /// Backend serving requests.
    pub backend: StorageKind,
    /// Set when the configured backend was unreachable.
    pub degraded: bool,
}

impl StorageStatus {
    /// The configured backend answered.
    pub fn healthy(backend: StorageKind) -> Self {
        Self {
            backend,
            degraded: false,
        }
    }

    /// The configured backend failed; memory serves instead.
    pub fn fallback() -> Self {
        Self {
            backend: StorageKind::Memory,
            degraded: true,
        }
    }
}

/// Context shared by every request: store handle, configuration and clock.
pub struct AppState {
    store: Arc<dyn PartyStore>,
    storage: StorageStatus,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    round_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        store: Arc<dyn PartyStore>,
        storage: StorageStatus,
        config: AppConfig,
        clock: Arc<dyn Clock>,
    ) -> SharedState {
        Arc::new(Self {
            store,
            storage,
            config,
            clock,
            round_gate: Mutex::new(()),
        })
    }

    /// State backed by a fresh memory store, as used when no durable backend is configured.
    pub fn in_memory(config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        Self::new(
            Arc::new(MemoryPartyStore::new()),
            StorageStatus::healthy(StorageKind::Memory),
            config,
            clock,
        )
    }

    /// Persistence backend.
    pub fn store(&self) -> &Arc<dyn PartyStore> {
        &self.store
    }

    /// Backend selected at startup.
    pub fn storage(&self) -> StorageStatus {
        self.storage
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current time in epoch milliseconds.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Run `work` while no other start or stop is in flight in this process.
    pub async fn run_round_transition<F, Fut, T>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _gate = self.round_gate.lock().await;
        work().await
    }
}
