//! Cached state for the current local day.
//!
//! A single record keyed by the local date key. Readers compare its
//! `date_local` with today's key themselves; a record from a previous day is
//! stale but is only ever replaced, never deleted.

use crate::api::TodayResponse;
use crate::clock::Clock;
use crate::constants::TODAY_CACHE_KEY;
use crate::errors::AppResult;
use crate::store::{read_json, write_json, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// The persisted "today" record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayCacheEntry {
    pub date_local: String,
    #[serde(default)]
    pub has_mood: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_rating: Option<u8>,
    #[serde(default)]
    pub has_reflected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_prompt_text: Option<String>,
    pub updated_at: i64,
}

impl TodayCacheEntry {
    fn fresh(date_local: String, now_millis: i64) -> Self {
        Self {
            date_local,
            has_mood: false,
            mood_rating: None,
            has_reflected: false,
            last_prompt_text: None,
            updated_at: now_millis,
        }
    }

    /// Whether this record belongs to `date_key`.
    pub fn is_for(&self, date_key: &str) -> bool {
        self.date_local == date_key
    }
}

/// A partial update; `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodayUpdate {
    /// Target date; defaults to today's local date key.
    pub date_local: Option<String>,
    pub has_mood: Option<bool>,
    pub mood_rating: Option<u8>,
    pub has_reflected: Option<bool>,
    pub last_prompt_text: Option<String>,
}

/// Reads and writes the [`TodayCacheEntry`].
pub struct TodayCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl TodayCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Today's local date key according to this cache's clock.
    pub fn local_date_key(&self) -> String {
        self.clock.today_key()
    }

    /// Returns the persisted record verbatim, stale or not.
    ///
    /// A corrupted record reads as `None`.
    pub async fn read(&self) -> AppResult<Option<TodayCacheEntry>> {
        read_json(self.store.as_ref(), TODAY_CACHE_KEY).await
    }

    /// Returns the persisted record only if it belongs to today.
    pub async fn read_current(&self) -> AppResult<Option<TodayCacheEntry>> {
        let today = self.local_date_key();
        Ok(self.read().await?.filter(|entry| entry.is_for(&today)))
    }

    /// Applies `update` and persists the result.
    ///
    /// When the stored record is for a different date than the target, the
    /// update starts from a fresh record instead of merging onto stale data.
    /// Otherwise the set fields are merged onto the stored record. `updated_at`
    /// is always stamped.
    pub async fn update(&self, update: TodayUpdate) -> AppResult<TodayCacheEntry> {
        let _guard = self.write_lock.lock().await;

        let now = self.clock.now_millis();
        let date_local = update
            .date_local
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.clock.today_key());

        let mut next = match self.read().await? {
            Some(existing) if existing.is_for(&date_local) => existing,
            Some(stale) => {
                debug!(
                    "Replacing today cache for {} with fresh record for {}",
                    stale.date_local, date_local
                );
                TodayCacheEntry::fresh(date_local.clone(), now)
            }
            None => TodayCacheEntry::fresh(date_local.clone(), now),
        };

        if let Some(has_mood) = update.has_mood {
            next.has_mood = has_mood;
        }
        if let Some(rating) = update.mood_rating {
            next.mood_rating = Some(rating);
        }
        if let Some(has_reflected) = update.has_reflected {
            next.has_reflected = has_reflected;
        }
        if let Some(text) = update.last_prompt_text {
            next.last_prompt_text = Some(text);
        }
        next.updated_at = now;

        write_json(self.store.as_ref(), TODAY_CACHE_KEY, &next).await?;
        Ok(next)
    }

    /// Projects a server "today" payload into the cache.
    ///
    /// The server's own `dateLocal` wins over the device date when present.
    pub async fn update_from_server_today(
        &self,
        server: &TodayResponse,
    ) -> AppResult<TodayCacheEntry> {
        self.update(TodayUpdate {
            date_local: server.date_local.clone(),
            has_mood: Some(server.has_mood.unwrap_or(false)),
            mood_rating: None,
            has_reflected: Some(server.reflected()),
            last_prompt_text: Some(server.prompt.text.clone()),
        })
        .await
    }
}
