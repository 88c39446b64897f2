//! Durable key-value storage.
//!
//! The caches and the outbox persist whole collections as JSON text under fixed
//! keys. This module defines the store they write to and the JSON helpers that
//! turn a corrupted value into "absent" instead of an error.
//!
//! # Module Structure
//!
//! - `memory`: In-process store for tests and ephemeral sessions
//! - `file`: One file per key in a locked data directory

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::errors::{AppResult, StorageError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// A durable string-to-string store that survives restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if nothing was stored.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Replaces the value stored under `key`.
    async fn set(&self, key: &str, value: String) -> AppResult<()>;
}

/// Reads and decodes the JSON value under `key`.
///
/// Missing, empty and malformed values all come back as `Ok(None)`; only a
/// failure of the store itself is an error.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> AppResult<Option<T>> {
    let raw = match store.get(key).await? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "Discarding corrupted value");
            Ok(None)
        }
    }
}

/// Encodes `value` as JSON and stores it under `key`.
pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> AppResult<()> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_round_trip_through_store() {
        let store = MemoryStore::new();
        let value = Sample {
            name: "bloom".to_string(),
            count: 3,
        };

        write_json(&store, "sample", &value).await.unwrap();
        let read: Option<Sample> = read_json(&store, "sample").await.unwrap();

        assert_eq!(read, Some(value));
    }

    #[tokio::test]
    async fn test_corrupted_value_reads_as_absent() {
        let store = MemoryStore::new();
        store.set("sample", "{not json".to_string()).await.unwrap();

        let read: Option<Sample> = read_json(&store, "sample").await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_reads_as_absent() {
        let store = MemoryStore::new();
        store
            .set("sample", r#"{"name": 7}"#.to_string())
            .await
            .unwrap();

        let read: Option<Sample> = read_json(&store, "sample").await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_missing_and_blank_values_read_as_absent() {
        let store = MemoryStore::new();
        let missing: Option<Sample> = read_json(&store, "sample").await.unwrap();
        assert!(missing.is_none());

        store.set("sample", "   ".to_string()).await.unwrap();
        let blank: Option<Sample> = read_json(&store, "sample").await.unwrap();
        assert!(blank.is_none());
    }
}
