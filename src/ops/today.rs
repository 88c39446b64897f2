//! Load today's prompt and completion state.

use crate::api::Prompt;
use crate::constants::LOCAL_PROMPT_ID;
use crate::errors::AppResult;
use crate::journal_core::JournalCore;
use crate::storage::{TodayCacheEntry, TodayUpdate};
use tracing::{debug, warn};

/// What the app shows for today.
#[derive(Debug, Clone, PartialEq)]
pub struct TodayView {
    pub prompt: Prompt,
    pub date_local: String,
    pub has_mood: bool,
    pub mood_rating: Option<u8>,
    pub has_reflected: bool,
    pub onboarding_completed: Option<bool>,
    pub did_swap_prompt: Option<bool>,
    /// True when the backend could not be asked and this came from the cache.
    pub from_cache: bool,
}

impl TodayView {
    fn from_cache(entry: TodayCacheEntry) -> Self {
        Self {
            prompt: Prompt {
                id: LOCAL_PROMPT_ID.to_string(),
                text: entry.last_prompt_text.unwrap_or_default(),
                created_at: None,
            },
            date_local: entry.date_local,
            has_mood: entry.has_mood,
            mood_rating: entry.mood_rating,
            has_reflected: entry.has_reflected,
            onboarding_completed: None,
            did_swap_prompt: None,
            from_cache: true,
        }
    }
}

/// Loads today's view, preferring the backend and falling back to the cache.
///
/// When authentication is ready the server's "today" is projected into the
/// Today Cache. Flags set optimistically on this device (a mood or reflection
/// the server has not seen yet) survive that projection. When the backend
/// cannot be reached, the cached entry is used only if it is for today's local
/// date; otherwise there is nothing to show and `None` is returned.
///
/// # Errors
///
/// Only local storage failures are returned.
pub async fn load_today(core: &JournalCore) -> AppResult<Option<TodayView>> {
    let cached = core.today.read_current().await?;

    if core.is_auth_ready() {
        match core.api.fetch_today().await {
            Ok(server) => {
                let mut entry = core.today.update_from_server_today(&server).await?;

                if let Some(previous) = cached.as_ref().filter(|c| c.is_for(&entry.date_local)) {
                    let keep_mood = previous.has_mood && !entry.has_mood;
                    let keep_reflected = previous.has_reflected && !entry.has_reflected;
                    if keep_mood || keep_reflected {
                        debug!("Keeping local flags the server has not seen yet");
                        entry = core
                            .today
                            .update(TodayUpdate {
                                date_local: Some(entry.date_local.clone()),
                                has_mood: keep_mood.then_some(true),
                                has_reflected: keep_reflected.then_some(true),
                                ..Default::default()
                            })
                            .await?;
                    }
                }

                return Ok(Some(TodayView {
                    prompt: server.prompt,
                    date_local: entry.date_local,
                    has_mood: entry.has_mood,
                    mood_rating: entry.mood_rating,
                    has_reflected: entry.has_reflected,
                    onboarding_completed: server.onboarding_completed,
                    did_swap_prompt: server.did_swap_prompt,
                    from_cache: false,
                }));
            }
            Err(e) => {
                core.observe_api_error(&e).await;
                warn!(error = %e, "Failed to fetch today, using cache");
            }
        }
    }

    Ok(cached.map(TodayView::from_cache))
}
