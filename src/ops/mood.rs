//! Record a mood rating for today.

use crate::api::MoodRequest;
use crate::errors::AppResult;
use crate::journal_core::JournalCore;
use crate::storage::{OutboxItem, OutboxPayload, TodayUpdate};
use crate::sync::FlushReport;
use tracing::info;

/// Result of a local write: the queued item and the flush it triggered, if any.
#[derive(Debug, Clone)]
pub struct MoodOutcome {
    pub item: OutboxItem,
    pub flush: Option<FlushReport>,
}

/// Records today's mood offline-first.
///
/// # Flow
///
/// 1. Validate the rating, tags and note
/// 2. Mark the mood as logged in the Today Cache
/// 3. Enqueue a `mood` outbox item stamped with today's local date
/// 4. Trigger a best-effort flush
///
/// The outcome is the same whether the device is online or not; delivery
/// happens whenever the outbox is next flushed.
///
/// Waits for the triggered flush pass, which makes one request per due outbox
/// item. Use [`JournalCore::set_flush_in_background`] to return without
/// waiting.
///
/// # Errors
///
/// Returns `AppError::Validation` for invalid input, before any local state
/// changes, or a storage error if the cache or outbox cannot be written.
pub async fn record_mood(
    core: &JournalCore,
    rating: u8,
    tags: Vec<String>,
    note: Option<String>,
) -> AppResult<MoodOutcome> {
    let request = MoodRequest {
        rating,
        date_local: Some(core.today.local_date_key()),
        tags: if tags.is_empty() { None } else { Some(tags) },
        note: note.filter(|n| !n.trim().is_empty()),
    };
    request.validate()?;

    core.today
        .update(TodayUpdate {
            has_mood: Some(true),
            mood_rating: Some(rating),
            ..Default::default()
        })
        .await?;

    let item = core.outbox.enqueue(OutboxPayload::Mood(request)).await?;
    info!("Recorded mood {} ({})", rating, item.id);

    let flush = core.flush_after_write().await;
    Ok(MoodOutcome { item, flush })
}
