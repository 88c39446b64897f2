//! HTTP client for the journaling backend.
//!
//! This module provides a [`RemoteApi`] implementation over `reqwest`. It adds
//! the bearer token, turns non-success responses into typed [`ApiError`]s, and
//! backs off for a short while after the backend answers with an HTML page
//! (a sign of a routing or deployment problem rather than an API error).

use super::schemas::{
    MomentRequest, MomentResponse, MomentsListResponse, MomentsQuery, MoodRequest, MoodResponse,
    ReflectionRequest, ReflectionResponse, StreaksResponse, TodayResponse,
};
use super::RemoteApi;
use crate::constants::{
    ENDPOINT_MOMENT, ENDPOINT_MOMENTS, ENDPOINT_MOOD, ENDPOINT_REFLECTION, ENDPOINT_STREAKS,
    ENDPOINT_TODAY, HTML_RESPONSE_CODE, HTTP_TIMEOUT_SECS, LOG_BODY_PREVIEW_CHARS,
    ROUTING_BACKOFF_MS,
};
use crate::errors::{ApiError, AppResult};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Client for the journaling backend.
pub struct HttpApiClient {
    base_url: String,
    client: Client,
    token: RwLock<Option<String>>,
    routing_backoff_until: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.has_token())
            .finish()
    }
}

/// Trims whitespace and trailing slashes from a base URL.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn is_html(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html")
}

fn preview(body: &str) -> String {
    body.chars().take(LOG_BODY_PREVIEW_CHARS).collect()
}

impl HttpApiClient {
    /// Creates a client for `base_url`, optionally already holding a token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Api` if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            base_url: normalize_base_url(base_url),
            client,
            token: RwLock::new(token),
            routing_backoff_until: Mutex::new(None),
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replaces the bearer token.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    /// Whether a bearer token is currently held.
    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn current_token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn routing_backoff_active(&self) -> bool {
        let until = self
            .routing_backoff_until
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        until.is_some_and(|until| Instant::now() < until)
    }

    fn start_routing_backoff(&self) {
        let mut until = self
            .routing_backoff_until
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *until = Some(Instant::now() + Duration::from_millis(ROUTING_BACKOFF_MS));
    }

    async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        if self.routing_backoff_active() {
            return Err(ApiError::RoutingBackoff.into());
        }

        let path = format!("/{}", endpoint.trim().trim_start_matches('/'));
        let url = format!("{}{}", self.base_url, path);
        let request_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let token = self.current_token();

        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            has_auth_header = token.is_some(),
            token_length = token.as_ref().map_or(0, |t| t.len()),
            "request"
        );

        let mut builder = self.client.request(method, &url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::Network)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let html = is_html(&text);

        if !status.is_success() || html {
            let (message, code) = if html {
                self.start_routing_backoff();
                (
                    "HTML response from API (routing error)".to_string(),
                    Some(HTML_RESPONSE_CODE.to_string()),
                )
            } else {
                error_details(status, &text)
            };

            warn!(
                request_id = %request_id,
                status = status.as_u16(),
                elapsed_ms,
                body_preview = %preview(&text),
                message = %message,
                "response"
            );

            if status == StatusCode::UNAUTHORIZED {
                debug!("Clearing bearer token after 401");
                self.set_token(None);
            }

            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
                code,
            }
            .into());
        }

        info!(
            request_id = %request_id,
            status = status.as_u16(),
            elapsed_ms,
            body_preview = %preview(&text),
            "response"
        );

        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {} response: {}", path, e)).into()
        })
    }
}

/// Extracts `message`/`error` and `code` from a JSON error body.
fn error_details(status: StatusCode, body: &str) -> (String, Option<String>) {
    let fallback = format!("Request failed with status {}", status.as_u16());
    let Ok(serde_json::Value::Object(fields)) = serde_json::from_str::<serde_json::Value>(body)
    else {
        return (fallback, None);
    };

    let text_field = |name: &str| {
        fields
            .get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let message = text_field("message")
        .or_else(|| text_field("error"))
        .unwrap_or(fallback);
    (message, text_field("code"))
}

#[async_trait]
impl RemoteApi for HttpApiClient {
    async fn fetch_today(&self) -> AppResult<TodayResponse> {
        self.request::<_, ()>(Method::GET, ENDPOINT_TODAY, &[], None)
            .await
    }

    async fn submit_mood(&self, request: &MoodRequest) -> AppResult<MoodResponse> {
        request.validate()?;
        self.request(Method::POST, ENDPOINT_MOOD, &[], Some(request))
            .await
    }

    async fn capture_moment(&self, request: &MomentRequest) -> AppResult<MomentResponse> {
        request.validate()?;
        self.request(Method::POST, ENDPOINT_MOMENT, &[], Some(request))
            .await
    }

    async fn fetch_moments(&self, query: &MomentsQuery) -> AppResult<MomentsListResponse> {
        let mut params = Vec::new();
        if let Some(limit) = query.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = query.cursor.as_ref().filter(|c| !c.is_empty()) {
            params.push(("cursor", cursor.clone()));
        }
        self.request::<_, ()>(Method::GET, ENDPOINT_MOMENTS, &params, None)
            .await
    }

    async fn submit_reflection(
        &self,
        request: &ReflectionRequest,
    ) -> AppResult<ReflectionResponse> {
        request.validate()?;
        self.request(Method::POST, ENDPOINT_REFLECTION, &[], Some(request))
            .await
    }

    async fn fetch_streaks(&self) -> AppResult<StreaksResponse> {
        self.request::<_, ()>(Method::GET, ENDPOINT_STREAKS, &[], None)
            .await
    }
}
