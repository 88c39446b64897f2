//! Manual sync and outbox inspection.

use crate::errors::AppResult;
use crate::journal_core::JournalCore;
use crate::storage::{OutboxItem, OutboxStatus};
use crate::sync::FlushReport;

/// Flushes the outbox now.
///
/// Returns `Ok(None)` when a flush was already running.
///
/// # Errors
///
/// Returns `AppError::NotAuthenticated` when authentication is not ready, or
/// a storage error from the flush.
pub async fn sync_now(core: &JournalCore) -> AppResult<Option<FlushReport>> {
    core.require_auth()?;
    core.sync.flush().await
}

/// Summarises the outbox.
pub async fn outbox_status(core: &JournalCore) -> AppResult<OutboxStatus> {
    core.outbox.status().await
}

/// Lists queued items in delivery order.
pub async fn pending_items(core: &JournalCore) -> AppResult<Vec<OutboxItem>> {
    core.outbox.list().await
}
