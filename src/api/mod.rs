//! Remote API gateway for the journaling backend.
//!
//! The core only talks to the backend through [`RemoteApi`], so the sync driver
//! and the read operations can be driven by a scripted implementation in tests.

pub mod client;
pub mod schemas;

pub use client::{normalize_base_url, HttpApiClient};
pub use schemas::{
    MomentItem, MomentRequest, MomentResponse, MomentsListResponse, MomentsQuery, MoodRequest,
    MoodResponse, Prompt, ReflectionRequest, ReflectionResponse, StreaksResponse, TodayResponse,
};

use crate::errors::AppResult;
use async_trait::async_trait;

/// Authenticated calls the core makes against the backend.
///
/// Implementations fail with `AppError::Api` for non-success or unreadable
/// responses, and with `AppError::Validation` when a request is rejected before
/// it is sent.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Fetches today's prompt and completion flags.
    async fn fetch_today(&self) -> AppResult<TodayResponse>;

    /// Records a mood rating.
    async fn submit_mood(&self, request: &MoodRequest) -> AppResult<MoodResponse>;

    /// Stores a captured moment and returns its server identifier.
    async fn capture_moment(&self, request: &MomentRequest) -> AppResult<MomentResponse>;

    /// Lists moments, newest first.
    async fn fetch_moments(&self, query: &MomentsQuery) -> AppResult<MomentsListResponse>;

    /// Submits today's reflection.
    async fn submit_reflection(&self, request: &ReflectionRequest)
        -> AppResult<ReflectionResponse>;

    /// Fetches reflection streak counters.
    async fn fetch_streaks(&self) -> AppResult<StreaksResponse>;
}
