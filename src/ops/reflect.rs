//! Submit today's reflection.

use crate::api::{ReflectionRequest, ReflectionResponse};
use crate::errors::AppResult;
use crate::journal_core::JournalCore;
use crate::storage::TodayUpdate;
use tracing::info;

/// Submits a reflection on today's prompt.
///
/// Reflections are not queued: the call goes straight to the backend and the
/// Today Cache is only marked reflected once the backend accepted it.
///
/// # Errors
///
/// Returns an error if:
/// - The text is blank
/// - Authentication is not ready
/// - The backend rejects the request or cannot be reached
pub async fn submit_reflection(core: &JournalCore, text: &str) -> AppResult<ReflectionResponse> {
    let request = ReflectionRequest {
        response_text: text.trim().to_string(),
    };
    request.validate()?;
    core.require_auth()?;

    let response = match core.api.submit_reflection(&request).await {
        Ok(response) => response,
        Err(e) => {
            core.observe_api_error(&e).await;
            return Err(e);
        }
    };

    core.today
        .update(TodayUpdate {
            has_reflected: Some(true),
            ..Default::default()
        })
        .await?;

    info!("Submitted reflection");
    Ok(response)
}
