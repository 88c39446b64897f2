//! Owned wiring of the offline-first core.
//!
//! [`JournalCore`] bundles the store, caches, outbox, sync driver, API gateway
//! and clock that the operations in [`crate::ops`] work against. There is no
//! global state: every component is constructed here and shared by `Arc`, so
//! tests can build as many independent cores as they like.

use crate::api::{HttpApiClient, RemoteApi};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::storage::{MomentCache, OutboxQueue, TodayCache};
use crate::store::{FileStore, KeyValueStore};
use crate::sync::{FlushReport, SyncDriver, TriggerReason};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// The assembled core.
pub struct JournalCore {
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub api: Arc<dyn RemoteApi>,
    pub today: Arc<TodayCache>,
    pub moments: Arc<MomentCache>,
    pub outbox: Arc<OutboxQueue>,
    pub sync: Arc<SyncDriver>,
    flush_in_background: AtomicBool,
}

impl JournalCore {
    /// Wires a core around the given store, gateway and clock.
    ///
    /// Authentication starts out not ready; see [`JournalCore::start`].
    ///
    /// # Examples
    ///
    /// ```
    /// use perspectiv::api::HttpApiClient;
    /// use perspectiv::clock::SystemClock;
    /// use perspectiv::store::MemoryStore;
    /// use perspectiv::JournalCore;
    /// use std::sync::Arc;
    ///
    /// let api = HttpApiClient::new("http://localhost:3000", None).unwrap();
    /// let core = JournalCore::new(
    ///     Arc::new(MemoryStore::new()),
    ///     Arc::new(api),
    ///     Arc::new(SystemClock),
    /// );
    /// assert!(!core.is_auth_ready());
    /// ```
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn RemoteApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let today = Arc::new(TodayCache::new(store.clone(), clock.clone()));
        let moments = Arc::new(MomentCache::new(store.clone(), clock.clone()));
        let outbox = Arc::new(OutboxQueue::new(store.clone(), clock.clone()));
        let sync = Arc::new(SyncDriver::new(
            outbox.clone(),
            moments.clone(),
            api.clone(),
            clock.clone(),
        ));

        Self {
            store,
            clock,
            api,
            today,
            moments,
            outbox,
            sync,
            flush_in_background: AtomicBool::new(false),
        }
    }

    /// Builds a core backed by the data directory and backend in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be opened or is locked by
    /// another process, or if the HTTP client cannot be built.
    pub fn open(config: &Config) -> AppResult<Self> {
        let store = FileStore::open(&config.data_dir)?;
        let api = HttpApiClient::new(&config.api_base_url, config.token.clone())?;
        debug!(
            "Opened core at {} against {}",
            store.dir().display(),
            api.base_url()
        );

        Ok(Self::new(Arc::new(store), Arc::new(api), Arc::new(SystemClock)))
    }

    /// Reports the initial authentication state to the sync driver.
    ///
    /// Becoming ready flushes the outbox once.
    pub async fn start(&self, auth_ready: bool) -> Option<FlushReport> {
        self.sync.set_auth_ready(auth_ready).await
    }

    /// Chooses whether writes wait for the flush they trigger.
    ///
    /// By default `record_mood` and `capture_moment` return after the flush
    /// pass completes, so their outcome carries its report. When set, the pass
    /// runs on a spawned task, the write returns as soon as the outbox item is
    /// stored, and the outcome's `flush` is `None`. Requires a running tokio
    /// runtime.
    pub fn set_flush_in_background(&self, background: bool) {
        self.flush_in_background.store(background, Ordering::Release);
    }

    /// Whether calls to the backend may be attempted.
    pub fn is_auth_ready(&self) -> bool {
        self.sync.is_auth_ready()
    }

    /// Fails with `AppError::NotAuthenticated` unless authentication is ready.
    pub(crate) fn require_auth(&self) -> AppResult<()> {
        if self.is_auth_ready() {
            Ok(())
        } else {
            Err(AppError::NotAuthenticated)
        }
    }

    /// Withdraws auth readiness when the backend rejected our credentials.
    pub(crate) async fn observe_api_error(&self, error: &AppError) {
        if error.is_unauthorized() {
            warn!("Backend rejected credentials; authentication no longer ready");
            self.sync.set_auth_ready(false).await;
        }
    }

    /// Best-effort flush after a local write.
    pub(crate) async fn flush_after_write(&self) -> Option<FlushReport> {
        if self.flush_in_background.load(Ordering::Acquire) {
            self.sync.spawn_trigger(TriggerReason::LocalWrite);
            return None;
        }
        self.sync.trigger(TriggerReason::LocalWrite).await
    }
}
