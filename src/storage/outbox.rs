//! Durable queue of writes waiting to reach the backend.
//!
//! Items are appended in insertion order and persisted as one JSON array. They
//! leave the queue only when delivered; a failed delivery reschedules them.

use crate::api::MoodRequest;
use crate::clock::Clock;
use crate::constants::OUTBOX_KEY;
use crate::errors::AppResult;
use crate::ids::outbox_id;
use crate::store::{read_json, write_json, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Payload of a queued moment capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_local: Option<String>,
    /// Placeholder id of the cached moment to reconcile after delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
}

/// What a queued item asks the backend to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum OutboxPayload {
    Mood(MoodRequest),
    Moment(MomentPayload),
}

impl OutboxPayload {
    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboxPayload::Mood(_) => "mood",
            OutboxPayload::Moment(_) => "moment",
        }
    }
}

/// A queued write with its retry bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxItem {
    pub id: String,
    #[serde(flatten)]
    pub payload: OutboxPayload,
    /// Failed delivery attempts so far.
    pub attempts: u32,
    /// Earliest epoch millis at which the item may be tried again.
    pub next_attempt_at: i64,
    pub created_at: i64,
}

impl OutboxItem {
    /// Whether the item may be attempted at `now_millis`.
    pub fn is_due(&self, now_millis: i64) -> bool {
        self.next_attempt_at <= now_millis
    }
}

/// Snapshot of the queue for status displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboxStatus {
    pub pending: usize,
    pub due: usize,
    pub oldest_created_at: Option<i64>,
    pub next_attempt_at: Option<i64>,
    pub max_attempts: u32,
}

/// The persisted outbox.
pub struct OutboxQueue {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl OutboxQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns every queued item in insertion order.
    pub async fn list(&self) -> AppResult<Vec<OutboxItem>> {
        Ok(read_json(self.store.as_ref(), OUTBOX_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Appends a new item due immediately. Never touches the network.
    pub async fn enqueue(&self, payload: OutboxPayload) -> AppResult<OutboxItem> {
        let _guard = self.write_lock.lock().await;

        let now = self.clock.now_millis();
        let item = OutboxItem {
            id: outbox_id(now),
            payload,
            attempts: 0,
            next_attempt_at: now,
            created_at: now,
        };

        let mut queue = self.list().await?;
        queue.push(item.clone());
        write_json(self.store.as_ref(), OUTBOX_KEY, &queue).await?;

        debug!(
            "Enqueued {} item {} ({} pending)",
            item.payload.kind(),
            item.id,
            queue.len()
        );
        Ok(item)
    }

    /// Summarises the queue as of the clock's current time.
    pub async fn status(&self) -> AppResult<OutboxStatus> {
        let now = self.clock.now_millis();
        let queue = self.list().await?;

        Ok(OutboxStatus {
            pending: queue.len(),
            due: queue.iter().filter(|item| item.is_due(now)).count(),
            oldest_created_at: queue.iter().map(|item| item.created_at).min(),
            next_attempt_at: queue.iter().map(|item| item.next_attempt_at).min(),
            max_attempts: queue.iter().map(|item| item.attempts).max().unwrap_or(0),
        })
    }

    /// Locks the queue against concurrent writers for a flush commit.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Writes the result of a flush pass.
    ///
    /// `remaining` is what is left of the items the pass started from. Items
    /// enqueued while the pass was delivering are kept after them in their
    /// original order. The caller must hold [`OutboxQueue::lock`].
    pub(crate) async fn commit_flush(
        &self,
        snapshot_ids: &HashSet<String>,
        mut remaining: Vec<OutboxItem>,
    ) -> AppResult<Vec<OutboxItem>> {
        let arrived: Vec<OutboxItem> = self
            .list()
            .await?
            .into_iter()
            .filter(|item| !snapshot_ids.contains(&item.id))
            .collect();
        if !arrived.is_empty() {
            debug!("Keeping {} item(s) enqueued during flush", arrived.len());
        }
        remaining.extend(arrived);

        write_json(self.store.as_ref(), OUTBOX_KEY, &remaining).await?;
        Ok(remaining)
    }
}
