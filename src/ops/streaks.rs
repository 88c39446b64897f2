//! Fetch reflection streaks.

use crate::api::StreaksResponse;
use crate::errors::AppResult;
use crate::journal_core::JournalCore;

/// Fetches the user's streak counters. Online only, nothing is cached.
///
/// # Errors
///
/// Returns `AppError::NotAuthenticated` when authentication is not ready, or
/// the gateway's error.
pub async fn fetch_streaks(core: &JournalCore) -> AppResult<StreaksResponse> {
    core.require_auth()?;

    match core.api.fetch_streaks().await {
        Ok(streaks) => Ok(streaks),
        Err(e) => {
            core.observe_api_error(&e).await;
            Err(e)
        }
    }
}
