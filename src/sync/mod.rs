//! Outbox delivery and the triggers that start it.
//!
//! The [`SyncDriver`] drains due outbox items against the remote API. At most
//! one flush runs at a time per driver: a flush requested while another is in
//! progress returns immediately without doing anything, it is not queued.
//!
//! Flushes are started by lifecycle triggers (authentication becoming ready,
//! the app returning to the foreground, connectivity coming back) and after
//! local writes. Triggers only fire while authentication is ready.

use crate::api::{MomentRequest, RemoteApi};
use crate::clock::Clock;
use crate::constants::{OUTBOX_BASE_DELAY_MS, OUTBOX_MAX_DELAY_MS, OUTBOX_WARN_ATTEMPTS};
use crate::errors::AppResult;
use crate::storage::{MomentCache, OutboxItem, OutboxPayload, OutboxQueue};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay before the next attempt after `attempts` failures.
///
/// `min(1500ms * 2^attempts, 60s)`.
///
/// ```
/// use perspectiv::sync::backoff_delay_ms;
///
/// assert_eq!(backoff_delay_ms(1), 3_000);
/// assert_eq!(backoff_delay_ms(5), 48_000);
/// assert_eq!(backoff_delay_ms(6), 60_000);
/// ```
pub fn backoff_delay_ms(attempts: u32) -> i64 {
    // 2^6 already exceeds the ceiling; clamping keeps the shift in range.
    let factor = 1_i64 << attempts.min(20);
    OUTBOX_BASE_DELAY_MS
        .saturating_mul(factor)
        .min(OUTBOX_MAX_DELAY_MS)
}

/// Foreground/background state reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

/// Events a host application forwards to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Authentication readiness changed.
    AuthReady(bool),
    /// The application changed foreground state.
    AppState(AppState),
    /// Network connectivity changed.
    Connectivity { connected: bool },
}

/// Why a flush was requested, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    AuthReady,
    Foreground,
    Reconnected,
    LocalWrite,
    Manual,
}

/// Outcome of one flush pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Items delivered and removed from the queue.
    pub delivered: usize,
    /// Items attempted and rescheduled.
    pub failed: usize,
    /// Items passed through untouched: not yet due, or after a 401.
    pub deferred: usize,
    /// Queue length after the pass was written.
    pub remaining: usize,
}

/// Releases the flush flag when dropped, whatever way the pass ends.
struct FlushGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlushGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drains the outbox and applies the trigger policy.
pub struct SyncDriver {
    outbox: Arc<OutboxQueue>,
    moments: Arc<MomentCache>,
    api: Arc<dyn RemoteApi>,
    clock: Arc<dyn Clock>,
    flushing: AtomicBool,
    auth_ready: AtomicBool,
}

impl SyncDriver {
    pub fn new(
        outbox: Arc<OutboxQueue>,
        moments: Arc<MomentCache>,
        api: Arc<dyn RemoteApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            outbox,
            moments,
            api,
            clock,
            flushing: AtomicBool::new(false),
            auth_ready: AtomicBool::new(false),
        }
    }

    /// Whether authentication is ready.
    pub fn is_auth_ready(&self) -> bool {
        self.auth_ready.load(Ordering::Acquire)
    }

    /// Whether a flush pass is running right now.
    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    /// Runs one delivery pass over the outbox.
    ///
    /// Returns `Ok(None)` without touching the queue if another pass is already
    /// running. Otherwise every due item is attempted in queue order: delivered
    /// items are dropped, failed items get `attempts + 1` and a backed-off
    /// `next_attempt_at`, items not yet due pass through unchanged. The
    /// resulting queue is persisted once at the end of the pass.
    ///
    /// A 401 withdraws auth readiness and ends delivery for the pass; the
    /// items after it pass through unchanged until auth is ready again.
    ///
    /// # Errors
    ///
    /// Only storage failures are returned. Delivery failures are recorded on the
    /// items and never surface here.
    pub async fn flush(&self) -> AppResult<Option<FlushReport>> {
        let Some(_guard) = FlushGuard::acquire(&self.flushing) else {
            debug!("Flush already in progress, skipping");
            return Ok(None);
        };

        let queue = self.outbox.list().await?;
        if queue.is_empty() {
            return Ok(Some(FlushReport::default()));
        }

        let now = self.clock.now_millis();
        let snapshot_ids: HashSet<String> = queue.iter().map(|item| item.id.clone()).collect();
        let mut report = FlushReport::default();
        let mut remaining = Vec::with_capacity(queue.len());
        let mut rejected = false;

        for item in queue {
            if rejected || !item.is_due(now) {
                report.deferred += 1;
                remaining.push(item);
                continue;
            }

            match self.deliver(&item).await {
                Ok(()) => {
                    debug!("Delivered {} item {}", item.payload.kind(), item.id);
                    report.delivered += 1;
                }
                Err(e) => {
                    if e.is_unauthorized() {
                        warn!("Credentials rejected during flush; authentication no longer ready");
                        self.auth_ready.store(false, Ordering::Release);
                        rejected = true;
                    }
                    report.failed += 1;
                    remaining.push(self.reschedule(item, &e.to_string()));
                }
            }
        }

        let _queue_lock = self.outbox.lock().await;
        let written = self.outbox.commit_flush(&snapshot_ids, remaining).await?;
        report.remaining = written.len();

        info!(
            delivered = report.delivered,
            failed = report.failed,
            deferred = report.deferred,
            remaining = report.remaining,
            "Outbox flush complete"
        );
        Ok(Some(report))
    }

    fn reschedule(&self, item: OutboxItem, error: &str) -> OutboxItem {
        let attempts = item.attempts + 1;
        let next_attempt_at = self.clock.now_millis() + backoff_delay_ms(attempts);

        if attempts >= OUTBOX_WARN_ATTEMPTS {
            warn!(
                id = %item.id,
                kind = item.payload.kind(),
                attempts,
                error,
                "Outbox item keeps failing"
            );
        } else {
            debug!(
                id = %item.id,
                kind = item.payload.kind(),
                attempts,
                next_attempt_at,
                error,
                "Outbox delivery failed, rescheduled"
            );
        }

        OutboxItem {
            attempts,
            next_attempt_at,
            ..item
        }
    }

    async fn deliver(&self, item: &OutboxItem) -> AppResult<()> {
        match &item.payload {
            OutboxPayload::Mood(payload) => {
                self.api.submit_mood(payload).await?;
            }
            OutboxPayload::Moment(payload) => {
                let request = MomentRequest {
                    text: payload.text.clone(),
                    image_url: payload.image_url.clone(),
                };
                let response = self.api.capture_moment(&request).await?;

                // The server has the moment now; a failed reconciliation must not
                // cause it to be sent twice.
                if let Err(e) = self
                    .moments
                    .mark_synced(payload.local_id.as_deref(), &response.id)
                    .await
                {
                    warn!(error = %e, "Failed to mark moment {} synced", response.id);
                }
            }
        }
        Ok(())
    }

    /// Flushes if authentication is ready, logging instead of returning errors.
    pub async fn trigger(&self, reason: TriggerReason) -> Option<FlushReport> {
        if !self.is_auth_ready() {
            debug!(?reason, "Auth not ready, flush not triggered");
            return None;
        }

        debug!(?reason, "Flush triggered");
        match self.flush().await {
            Ok(report) => report,
            Err(e) => {
                warn!(?reason, error = %e, "Outbox flush failed");
                None
            }
        }
    }

    /// Runs [`SyncDriver::trigger`] on a spawned task and returns without
    /// waiting for the pass.
    pub fn spawn_trigger(
        self: &Arc<Self>,
        reason: TriggerReason,
    ) -> JoinHandle<Option<FlushReport>> {
        let driver = Arc::clone(self);
        tokio::spawn(async move { driver.trigger(reason).await })
    }

    /// Records auth readiness; flushes once when it becomes ready.
    pub async fn set_auth_ready(&self, ready: bool) -> Option<FlushReport> {
        let was_ready = self.auth_ready.swap(ready, Ordering::AcqRel);
        if ready && !was_ready {
            info!("Authentication ready");
            return self.trigger(TriggerReason::AuthReady).await;
        }
        None
    }

    /// Flushes when the application returns to the foreground.
    pub async fn on_app_state_change(&self, state: AppState) -> Option<FlushReport> {
        if state == AppState::Active {
            return self.trigger(TriggerReason::Foreground).await;
        }
        None
    }

    /// Flushes when connectivity is restored.
    pub async fn on_connectivity_change(&self, connected: bool) -> Option<FlushReport> {
        if connected {
            return self.trigger(TriggerReason::Reconnected).await;
        }
        None
    }

    /// Applies the trigger policy to one lifecycle event.
    pub async fn handle_event(&self, event: LifecycleEvent) -> Option<FlushReport> {
        match event {
            LifecycleEvent::AuthReady(ready) => self.set_auth_ready(ready).await,
            LifecycleEvent::AppState(state) => self.on_app_state_change(state).await,
            LifecycleEvent::Connectivity { connected } => {
                self.on_connectivity_change(connected).await
            }
        }
    }

    /// Spawns a task applying the trigger policy to every event received.
    ///
    /// The task ends when all senders are dropped.
    pub fn spawn_listener(self: Arc<Self>, mut events: mpsc::Receiver<LifecycleEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle_event(event).await;
            }
            debug!("Lifecycle event channel closed");
        })
    }
}
