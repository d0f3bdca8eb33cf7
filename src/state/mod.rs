use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{RwLock, watch};

use crate::{clock::Clock, config::AppConfig, dao::jam_store::JamStore, error::ServiceError};

/// Shared handle passed to every route.
pub type SharedState = Arc<AppState>;

/// Central application state holding the storage handle and runtime settings.
pub struct AppState {
    jam_store: RwLock<Option<Arc<dyn JamStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    clock: Clock,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self::build(config, Clock::System, None))
    }

    /// State with a store already installed, used by tests and the in-memory backend.
    pub fn with_store(config: AppConfig, clock: Clock, store: Arc<dyn JamStore>) -> SharedState {
        Arc::new(Self::build(config, clock, Some(store)))
    }

    fn build(config: AppConfig, clock: Clock, store: Option<Arc<dyn JamStore>>) -> Self {
        let (degraded_tx, _rx) = watch::channel(store.is_none());
        Self {
            jam_store: RwLock::new(store),
            degraded: degraded_tx,
            config,
            clock,
        }
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn jam_store(&self) -> Option<Arc<dyn JamStore>> {
        self.jam_store.read().await.as_ref().cloned()
    }

    /// Store handle, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_jam_store(&self) -> Result<Arc<dyn JamStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.jam_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_jam_store(&self, store: Arc<dyn JamStore>) {
        *self.jam_store.write().await = Some(store);
        self.update_degraded(false);
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current instant used to bucket game jams in views.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::jam_store::memory::MemoryJamStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_jam_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_jam_store(Arc::new(MemoryJamStore::new(Clock::System)))
            .await;
        assert!(!state.is_degraded());
        assert!(state.require_jam_store().await.is_ok());
    }

    #[tokio::test]
    async fn degraded_flag_is_broadcast_to_watchers() {
        let state = AppState::with_store(
            AppConfig::default(),
            Clock::System,
            Arc::new(MemoryJamStore::new(Clock::System)),
        );
        let mut watcher = state.degraded_watcher();

        state.update_degraded(true);
        assert!(watcher.has_changed().unwrap());
        assert!(*watcher.borrow_and_update());
        assert!(matches!(
            state.require_jam_store().await,
            Err(ServiceError::Degraded)
        ));
    }
}
