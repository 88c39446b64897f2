//! Bounded, deduplicated list of captured moments.
//!
//! Holds both server-confirmed moments and moments captured locally that are
//! still waiting for the outbox to deliver them. Newest first, capped at
//! [`MOMENT_CACHE_LIMIT`] entries.

use crate::api::MomentItem;
use crate::clock::Clock;
use crate::constants::{MOMENT_CACHE_KEY, MOMENT_CACHE_LIMIT};
use crate::errors::AppResult;
use crate::ids::local_moment_id;
use crate::store::{read_json, write_json, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::sync::Mutex;
use tracing::debug;

/// A moment as cached on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMoment {
    /// Server identifier, or the local placeholder before sync.
    pub id: String,
    /// Set only for moments captured on this device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub pending_sync: bool,
}

impl LocalMoment {
    /// The `text::createdAt` key used to recognise one moment across sources.
    pub fn dedup_key(&self) -> String {
        dedup_key(self.text.as_deref(), &self.created_at)
    }
}

impl From<MomentItem> for LocalMoment {
    fn from(item: MomentItem) -> Self {
        Self {
            id: item.id,
            local_id: None,
            text: item.text,
            image_url: item.image_url,
            created_at: item.created_at,
            pending_sync: false,
        }
    }
}

fn dedup_key(text: Option<&str>, created_at: &str) -> String {
    format!("{}::{}", text.unwrap_or_default(), created_at)
}

/// Merges authoritative server moments with locally cached ones.
///
/// Server items are kept in their given order, first occurrence of each dedup
/// key wins. Local items follow, skipping any whose id the server already
/// returned and any whose dedup key was already seen. The result is truncated
/// to `limit`.
///
/// Two distinct moments with identical text (or none) captured at the same
/// instant collapse into one.
pub fn merge_moments(
    server_items: Vec<LocalMoment>,
    local_items: Vec<LocalMoment>,
    limit: usize,
) -> Vec<LocalMoment> {
    let mut seen_keys = HashSet::new();
    let mut server_ids = HashSet::new();
    let mut merged = Vec::with_capacity(server_items.len() + local_items.len());

    for item in server_items {
        if !seen_keys.insert(item.dedup_key()) {
            continue;
        }
        if !item.id.is_empty() {
            server_ids.insert(item.id.clone());
        }
        merged.push(item);
    }

    for item in local_items {
        if server_ids.contains(&item.id) {
            continue;
        }
        if !seen_keys.insert(item.dedup_key()) {
            continue;
        }
        merged.push(item);
    }

    merged.truncate(limit);
    merged
}

type Listener = Arc<dyn Fn(&[LocalMoment]) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

/// Handle returned by [`MomentCache::subscribe`].
///
/// The listener stays registered until [`Subscription::unsubscribe`] is called
/// or the handle is dropped.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<StdMutex<Listeners>>,
}

impl Subscription {
    /// Removes the listener.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .entries
                .remove(&self.id);
        }
    }
}

/// Owns the cached moment list.
pub struct MomentCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    limit: usize,
    write_lock: Mutex<()>,
    listeners: Arc<StdMutex<Listeners>>,
}

impl MomentCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_limit(store, clock, MOMENT_CACHE_LIMIT)
    }

    /// Creates a cache holding at most `limit` moments.
    pub fn with_limit(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, limit: usize) -> Self {
        Self {
            store,
            clock,
            limit,
            write_lock: Mutex::new(()),
            listeners: Arc::new(StdMutex::new(Listeners::default())),
        }
    }

    /// Returns the cached moments, newest first. No network access.
    pub async fn list(&self) -> AppResult<Vec<LocalMoment>> {
        Ok(read_json(self.store.as_ref(), MOMENT_CACHE_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Prepends a pending moment captured on this device.
    pub async fn add_local(&self, text: &str) -> AppResult<LocalMoment> {
        let _guard = self.write_lock.lock().await;

        let local_id = local_moment_id(self.clock.now_millis());
        let item = LocalMoment {
            id: local_id.clone(),
            local_id: Some(local_id),
            text: Some(text.to_string()),
            image_url: None,
            created_at: self.clock.now_iso(),
            pending_sync: true,
        };

        let mut next = Vec::with_capacity(self.limit);
        next.push(item.clone());
        next.extend(self.list().await?);
        next.truncate(self.limit);

        self.persist(&next).await?;
        debug!("Added local moment {}", item.id);
        Ok(item)
    }

    /// Replaces a placeholder identifier with the server's and clears `pending_sync`.
    ///
    /// Matches on `local_id`, falling back to the current `id`. Does nothing
    /// when `local_id` is `None` or no entry matches.
    pub async fn mark_synced(&self, local_id: Option<&str>, server_id: &str) -> AppResult<()> {
        let Some(local_id) = local_id else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;

        let mut items = self.list().await?;
        let mut found = false;
        for item in items.iter_mut() {
            if item.local_id.as_deref() == Some(local_id) || item.id == local_id {
                item.id = server_id.to_string();
                item.pending_sync = false;
                found = true;
            }
        }

        if !found {
            debug!("No cached moment for {}, nothing to mark synced", local_id);
            return Ok(());
        }

        self.persist(&items).await?;
        debug!("Marked moment {} synced as {}", local_id, server_id);
        Ok(())
    }

    /// Reconciles server moments with the cache and persists the union.
    pub async fn merge_server(&self, server_items: Vec<MomentItem>) -> AppResult<Vec<LocalMoment>> {
        let _guard = self.write_lock.lock().await;

        let server: Vec<LocalMoment> = server_items.into_iter().map(LocalMoment::from).collect();
        let merged = merge_moments(server, self.list().await?, self.limit);

        self.persist(&merged).await?;
        Ok(merged)
    }

    /// Registers `listener` to receive the full list after every persisted change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[LocalMoment]) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, Arc::new(listener));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    async fn persist(&self, items: &[LocalMoment]) -> AppResult<()> {
        write_json(self.store.as_ref(), MOMENT_CACHE_KEY, items).await?;
        self.notify(items);
        Ok(())
    }

    fn notify(&self, items: &[LocalMoment]) {
        // Listeners run outside the registry lock so they may (un)subscribe.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(items);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::{Duration, Local, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, MomentCache) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let cache = MomentCache::new(store.clone(), clock.clone());
        (store, clock, cache)
    }

    fn server_item(id: &str, text: &str, created_at: &str) -> MomentItem {
        MomentItem {
            id: id.to_string(),
            text: Some(text.to_string()),
            image_url: None,
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_local_prepends_pending_entry() {
        let (_store, clock, cache) = setup();

        cache.add_local("first").await.unwrap();
        clock.advance(Duration::seconds(1));
        let added = cache.add_local("hello").await.unwrap();

        let items = cache.list().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], added);
        assert_eq!(items[0].text.as_deref(), Some("hello"));
        assert!(items[0].pending_sync);
        assert_eq!(items[0].local_id.as_deref(), Some(items[0].id.as_str()));
        assert!(items[0].id.starts_with("local_"));
        assert_eq!(items[1].text.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_mark_synced_by_local_id() {
        let (_store, _clock, cache) = setup();
        let added = cache.add_local("walk in the park").await.unwrap();

        cache
            .mark_synced(added.local_id.as_deref(), "srv_1")
            .await
            .unwrap();

        let items = cache.list().await.unwrap();
        assert_eq!(items[0].id, "srv_1");
        assert!(!items[0].pending_sync);
        assert_eq!(items[0].local_id, added.local_id);
    }

    #[tokio::test]
    async fn test_mark_synced_falls_back_to_id_match() {
        let (store, _clock, cache) = setup();
        let legacy = vec![LocalMoment {
            id: "local_1_abcdef".to_string(),
            local_id: None,
            text: Some("legacy".to_string()),
            image_url: None,
            created_at: "2024-03-01T08:00:00.000Z".to_string(),
            pending_sync: true,
        }];
        write_json(store.as_ref(), MOMENT_CACHE_KEY, &legacy)
            .await
            .unwrap();

        cache
            .mark_synced(Some("local_1_abcdef"), "srv_9")
            .await
            .unwrap();

        let items = cache.list().await.unwrap();
        assert_eq!(items[0].id, "srv_9");
        assert!(!items[0].pending_sync);
    }

    #[tokio::test]
    async fn test_mark_synced_without_local_id_or_match_is_noop() {
        let (store, _clock, cache) = setup();
        cache.add_local("kept").await.unwrap();
        let writes = store.write_count();

        cache.mark_synced(None, "srv_1").await.unwrap();
        cache.mark_synced(Some("local_missing"), "srv_1").await.unwrap();

        assert_eq!(store.write_count(), writes);
        assert!(cache.list().await.unwrap()[0].pending_sync);
    }

    #[test]
    fn test_merge_prefers_server_and_dedups_echoes() {
        let local = LocalMoment {
            id: "local_1_aaaaaa".to_string(),
            local_id: Some("local_1_aaaaaa".to_string()),
            text: Some("sunset".to_string()),
            image_url: None,
            created_at: "2024-03-01T18:00:00.000Z".to_string(),
            pending_sync: true,
        };
        let server = vec![LocalMoment::from(server_item(
            "srv_1",
            "sunset",
            "2024-03-01T18:00:00.000Z",
        ))];

        let merged = merge_moments(server, vec![local], MOMENT_CACHE_LIMIT);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "srv_1");
        assert!(!merged[0].pending_sync);
    }

    #[test]
    fn test_merge_skips_local_items_already_confirmed_by_id() {
        let confirmed = LocalMoment {
            id: "srv_1".to_string(),
            local_id: Some("local_1_aaaaaa".to_string()),
            text: Some("edited locally".to_string()),
            image_url: None,
            created_at: "2024-03-01T18:00:00.000Z".to_string(),
            pending_sync: false,
        };
        let server = vec![LocalMoment::from(server_item(
            "srv_1",
            "edited on server",
            "2024-03-01T18:00:00.000Z",
        ))];

        let merged = merge_moments(server, vec![confirmed], MOMENT_CACHE_LIMIT);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text.as_deref(), Some("edited on server"));
    }

    #[test]
    fn test_merge_keeps_first_server_duplicate_and_appends_pending() {
        let server = vec![
            LocalMoment::from(server_item("srv_2", "b", "2024-03-01T10:00:00.000Z")),
            LocalMoment::from(server_item("srv_3", "b", "2024-03-01T10:00:00.000Z")),
            LocalMoment::from(server_item("srv_1", "a", "2024-03-01T09:00:00.000Z")),
        ];
        let pending = LocalMoment {
            id: "local_5_bbbbbb".to_string(),
            local_id: Some("local_5_bbbbbb".to_string()),
            text: Some("c".to_string()),
            image_url: None,
            created_at: "2024-03-01T11:00:00.000Z".to_string(),
            pending_sync: true,
        };

        let merged = merge_moments(server, vec![pending], MOMENT_CACHE_LIMIT);
        let ids: Vec<&str> = merged.iter().map(|m| m.id.as_str()).collect();

        assert_eq!(ids, vec!["srv_2", "srv_1", "local_5_bbbbbb"]);
    }

    #[test]
    fn test_merge_collapses_image_only_moments_at_same_instant() {
        let image = |id: &str| LocalMoment {
            id: id.to_string(),
            local_id: None,
            text: None,
            image_url: Some(format!("https://cdn.example.com/{}.jpg", id)),
            created_at: "2024-03-01T12:00:00.000Z".to_string(),
            pending_sync: false,
        };

        let merged = merge_moments(vec![image("srv_1")], vec![image("srv_2")], 10);
        assert_eq!(merged.len(), 1);
    }

    #[tokio::test]
    async fn test_merge_server_persists_union() {
        let (_store, _clock, cache) = setup();
        let pending = cache.add_local("offline note").await.unwrap();

        let merged = cache
            .merge_server(vec![server_item(
                "srv_1",
                "from server",
                "2024-02-28T09:00:00.000Z",
            )])
            .await
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "srv_1");
        assert_eq!(merged[1].id, pending.id);
        assert_eq!(cache.list().await.unwrap(), merged);
    }

    #[tokio::test]
    async fn test_cap_keeps_most_recent() {
        let (_store, clock, cache) = setup();

        for i in 0..105 {
            cache.add_local(&format!("moment {}", i)).await.unwrap();
            clock.advance(Duration::seconds(1));
        }

        let items = cache.list().await.unwrap();
        assert_eq!(items.len(), MOMENT_CACHE_LIMIT);
        assert_eq!(items[0].text.as_deref(), Some("moment 104"));
        assert_eq!(items[99].text.as_deref(), Some("moment 5"));
    }

    #[tokio::test]
    async fn test_subscribers_observe_persisted_state() {
        let (store, _clock, cache) = setup();
        let store_for_listener = store.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let subscription = cache.subscribe(move |items| {
            // The write has already landed when listeners run.
            assert!(store_for_listener.write_count() >= 1);
            assert_eq!(items[0].text.as_deref(), Some("noticed"));
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let second_calls = Arc::new(AtomicUsize::new(0));
        let second_seen = second_calls.clone();
        let _second = cache.subscribe(move |_| {
            second_seen.fetch_add(1, Ordering::SeqCst);
        });

        cache.add_local("noticed").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        cache.add_local("noticed").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corrupted_cache_lists_empty() {
        let (store, _clock, cache) = setup();
        store
            .set(MOMENT_CACHE_KEY, "[{\"id\":".to_string())
            .await
            .unwrap();

        assert!(cache.list().await.unwrap().is_empty());
        cache.add_local("recovered").await.unwrap();
        assert_eq!(cache.list().await.unwrap().len(), 1);
    }
}
