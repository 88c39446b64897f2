//! Capture a moment.

use crate::api::MomentRequest;
use crate::errors::AppResult;
use crate::journal_core::JournalCore;
use crate::storage::{LocalMoment, MomentPayload, OutboxItem, OutboxPayload};
use crate::sync::FlushReport;
use tracing::info;

/// The cached placeholder, its queued delivery, and the flush it triggered.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub moment: LocalMoment,
    pub item: OutboxItem,
    pub flush: Option<FlushReport>,
}

/// Captures a text moment offline-first.
///
/// The moment is visible in the Moment Cache immediately with a local
/// placeholder id and `pending_sync` set. The queued item carries that
/// placeholder so delivery can swap in the server id.
///
/// Waits for the triggered flush pass, which makes one request per due outbox
/// item. Use [`JournalCore::set_flush_in_background`] to return without
/// waiting.
///
/// # Errors
///
/// Returns `AppError::Validation` for empty or over-long text, before any
/// local state changes, or a storage error if the cache or outbox cannot be
/// written.
pub async fn capture_moment(core: &JournalCore, text: &str) -> AppResult<CaptureOutcome> {
    let text = text.trim();
    MomentRequest {
        text: Some(text.to_string()),
        image_url: None,
    }
    .validate()?;

    let moment = core.moments.add_local(text).await?;

    let item = core
        .outbox
        .enqueue(OutboxPayload::Moment(MomentPayload {
            text: Some(text.to_string()),
            image_url: None,
            date_local: Some(core.today.local_date_key()),
            local_id: moment.local_id.clone(),
        }))
        .await?;
    info!("Captured moment {} ({})", moment.id, item.id);

    let flush = core.flush_after_write().await;
    Ok(CaptureOutcome {
        moment,
        item,
        flush,
    })
}
