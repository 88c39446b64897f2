//! Locally generated identifiers.
//!
//! Identifiers take the form `<prefix>_<epochMillis>_<random>`: sortable by
//! creation time, and unique enough for one device's offline writes.

use crate::constants::{ID_SUFFIX_LEN, LOCAL_ID_PREFIX, OUTBOX_ID_PREFIX};
use uuid::Uuid;

/// Builds an identifier from a prefix, a timestamp and a short random suffix.
pub fn generate_id(prefix: &str, now_millis: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, now_millis, &random[..ID_SUFFIX_LEN])
}

/// Generates a placeholder identifier for a moment captured before sync.
pub fn local_moment_id(now_millis: i64) -> String {
    generate_id(LOCAL_ID_PREFIX, now_millis)
}

/// Generates an identifier for an outbox entry.
pub fn outbox_id(now_millis: i64) -> String {
    generate_id(OUTBOX_ID_PREFIX, now_millis)
}
