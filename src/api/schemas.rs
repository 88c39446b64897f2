//! Request and response shapes exchanged with the journaling backend.
//!
//! All bodies are camelCase JSON. Request types carry their own `validate`
//! so that malformed input is rejected before it reaches the network or the
//! outbox.

use crate::constants::{
    MAX_MOMENT_TEXT_CHARS, MAX_MOOD_NOTE_CHARS, MAX_MOOD_RATING, MAX_MOOD_TAGS, MIN_MOOD_RATING,
};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// The daily prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Response of `GET /today`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayResponse {
    pub prompt: Prompt,
    #[serde(default)]
    pub has_reflected: Option<bool>,
    /// Older servers report the reflection flag under this name.
    #[serde(default)]
    pub has_reflected_today: Option<bool>,
    #[serde(default)]
    pub onboarding_completed: Option<bool>,
    #[serde(default)]
    pub has_mood: Option<bool>,
    #[serde(default)]
    pub did_swap_prompt: Option<bool>,
    #[serde(default)]
    pub date_local: Option<String>,
}

impl TodayResponse {
    /// Whether the user already reflected today, accepting either field name.
    pub fn reflected(&self) -> bool {
        self.has_reflected
            .or(self.has_reflected_today)
            .unwrap_or(false)
    }
}

/// Body of `POST /mood`. Also the payload of a queued mood submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodRequest {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_local: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MoodRequest {
    /// Checks rating range, tag count and note length.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` describing the first violated rule.
    pub fn validate(&self) -> AppResult<()> {
        if !(MIN_MOOD_RATING..=MAX_MOOD_RATING).contains(&self.rating) {
            return Err(AppError::Validation(format!(
                "Mood rating must be between {} and {}, got {}",
                MIN_MOOD_RATING, MAX_MOOD_RATING, self.rating
            )));
        }
        if let Some(tags) = &self.tags {
            if tags.len() > MAX_MOOD_TAGS {
                return Err(AppError::Validation(format!(
                    "At most {} mood tags are allowed, got {}",
                    MAX_MOOD_TAGS,
                    tags.len()
                )));
            }
        }
        if let Some(note) = &self.note {
            if note.chars().count() > MAX_MOOD_NOTE_CHARS {
                return Err(AppError::Validation(format!(
                    "Mood note must be at most {} characters",
                    MAX_MOOD_NOTE_CHARS
                )));
            }
        }
        Ok(())
    }
}

/// Response of `POST /mood`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodResponse {
    pub saved: bool,
}

/// Body of `POST /moment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MomentRequest {
    /// Requires text or an image, and caps text length.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` describing the violated rule.
    pub fn validate(&self) -> AppResult<()> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.is_empty());
        let has_image = self.image_url.as_deref().is_some_and(|u| !u.is_empty());
        if !has_text && !has_image {
            return Err(AppError::Validation(
                "Either text or imageUrl is required".to_string(),
            ));
        }
        validate_moment_text(self.text.as_deref().unwrap_or_default())
    }
}

/// Caps moment text at the backend's limit.
pub(crate) fn validate_moment_text(text: &str) -> AppResult<()> {
    if text.chars().count() > MAX_MOMENT_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "Moment text must be at most {} characters",
            MAX_MOMENT_TEXT_CHARS
        )));
    }
    Ok(())
}

/// Response of `POST /moment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentResponse {
    pub saved: bool,
    pub id: String,
}

/// A moment as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentItem {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: String,
}

/// Response of `GET /moments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentsListResponse {
    pub items: Vec<MomentItem>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Paging parameters for `GET /moments`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MomentsQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// Body of `POST /reflection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionRequest {
    pub response_text: String,
}

impl ReflectionRequest {
    /// Rejects blank reflections.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the text is empty or whitespace.
    pub fn validate(&self) -> AppResult<()> {
        if self.response_text.trim().is_empty() {
            return Err(AppError::Validation(
                "Reflection text cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A stored reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub id: String,
    pub response_text: String,
    pub created_at: String,
}

/// Response of `POST /reflection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub saved: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success_message: Option<String>,
    #[serde(default)]
    pub safety_flagged: Option<bool>,
    #[serde(default)]
    pub reflection: Option<Reflection>,
}

/// Response of `GET /streaks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreaksResponse {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_reflections: u32,
    #[serde(default)]
    pub last_reflection_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mood(rating: u8) -> MoodRequest {
        MoodRequest {
            rating,
            date_local: None,
            tags: None,
            note: None,
        }
    }

    #[test]
    fn test_mood_rating_bounds() {
        assert!(mood(1).validate().is_ok());
        assert!(mood(5).validate().is_ok());
        assert!(matches!(mood(0).validate(), Err(AppError::Validation(_))));
        assert!(matches!(mood(6).validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_mood_tags_and_note_limits() {
        let mut request = mood(3);
        request.tags = Some((0..6).map(|i| format!("tag{}", i)).collect());
        assert!(request.validate().is_err());

        request.tags = Some((0..5).map(|i| format!("tag{}", i)).collect());
        assert!(request.validate().is_ok());

        request.note = Some("x".repeat(201));
        assert!(request.validate().is_err());

        request.note = Some("é".repeat(200));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_moment_request_needs_content() {
        let empty = MomentRequest {
            text: None,
            image_url: None,
        };
        assert!(empty.validate().is_err());

        let image_only = MomentRequest {
            text: None,
            image_url: Some("https://example.com/a.png".to_string()),
        };
        assert!(image_only.validate().is_ok());

        let too_long = MomentRequest {
            text: Some("a".repeat(281)),
            image_url: None,
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_mood_request_omits_absent_fields() {
        let json = serde_json::to_value(mood(4)).unwrap();
        assert_eq!(json, serde_json::json!({ "rating": 4 }));
    }

    #[test]
    fn test_today_response_accepts_legacy_reflection_flag() {
        let today: TodayResponse = serde_json::from_str(
            r#"{"prompt":{"id":"p1","text":"What made you smile?"},"hasReflectedToday":true}"#,
        )
        .unwrap();

        assert!(today.reflected());
        assert_eq!(today.has_mood, None);
        assert_eq!(today.date_local, None);
    }

    #[test]
    fn test_moment_item_tolerates_null_fields() {
        let item: MomentItem = serde_json::from_str(
            r#"{"id":"m1","text":null,"imageUrl":null,"createdAt":"2024-03-01T09:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(item.text, None);
        assert_eq!(item.image_url, None);
    }
}
