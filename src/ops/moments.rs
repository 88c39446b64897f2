//! Load the moments feed.

use crate::api::MomentsQuery;
use crate::errors::AppResult;
use crate::journal_core::JournalCore;
use crate::storage::LocalMoment;
use tracing::warn;

/// One page of the moments feed.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentsPage {
    pub items: Vec<LocalMoment>,
    pub next_cursor: Option<String>,
    /// True when the backend could not be asked and this came from the cache.
    pub from_cache: bool,
}

/// Loads up to `limit` moments, newest first.
///
/// The first page (no `cursor`) is merged into the Moment Cache so pending
/// local captures stay visible next to server items. Later pages are returned
/// as the server sent them. When the backend cannot be reached the cached
/// list is returned instead, without a cursor.
///
/// # Errors
///
/// Only local storage failures are returned.
pub async fn load_moments(
    core: &JournalCore,
    limit: usize,
    cursor: Option<String>,
) -> AppResult<MomentsPage> {
    if core.is_auth_ready() {
        let query = MomentsQuery {
            limit: u32::try_from(limit).ok(),
            cursor: cursor.clone(),
        };
        match core.api.fetch_moments(&query).await {
            Ok(page) => {
                let mut items = if cursor.is_none() {
                    core.moments.merge_server(page.items).await?
                } else {
                    page.items.into_iter().map(LocalMoment::from).collect()
                };
                items.truncate(limit);
                return Ok(MomentsPage {
                    items,
                    next_cursor: page.next_cursor,
                    from_cache: false,
                });
            }
            Err(e) => {
                core.observe_api_error(&e).await;
                warn!(error = %e, "Failed to fetch moments, using cache");
            }
        }
    }

    let mut items = core.moments.list().await?;
    items.truncate(limit);
    Ok(MomentsPage {
        items,
        next_cursor: None,
        from_cache: true,
    })
}
