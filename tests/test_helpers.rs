#![allow(dead_code)]

use assert_cmd::Command;
use async_trait::async_trait;
use chrono::{Local, TimeZone};
use perspectiv::api::{
    MomentItem, MomentRequest, MomentResponse, MomentsListResponse, MomentsQuery, MoodRequest,
    MoodResponse, Prompt, ReflectionRequest, ReflectionResponse, RemoteApi, StreaksResponse,
    TodayResponse,
};
use perspectiv::clock::ManualClock;
use perspectiv::errors::{ApiError, AppError, AppResult};
use perspectiv::store::MemoryStore;
use perspectiv::JournalCore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Creates a `Command` for the `perspectiv` binary with a clean environment.
pub fn base_perspectiv_command() -> Command {
    let mut cmd = Command::cargo_bin("perspectiv").expect("perspectiv binary not built");
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }
    if let Ok(tmpdir) = std::env::var("TMPDIR") {
        cmd.env("TMPDIR", tmpdir);
    }
    cmd
}

/// 2024-03-01 09:00 local time.
pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ))
}

pub fn server_error() -> AppError {
    AppError::Api(ApiError::Status {
        status: 500,
        message: "scripted failure".to_string(),
        code: None,
    })
}

pub fn unauthorized() -> AppError {
    AppError::Api(ApiError::Status {
        status: 401,
        message: "Unauthorized".to_string(),
        code: None,
    })
}

/// A [`RemoteApi`] whose answers are set up by the test.
///
/// Mood and moment deliveries succeed unless failures are scheduled with
/// [`ScriptedApi::fail_next`] or [`ScriptedApi::set_offline`]. Reads fail
/// unless a response was configured.
#[derive(Default)]
pub struct ScriptedApi {
    pub moods: Mutex<Vec<MoodRequest>>,
    pub moments: Mutex<Vec<MomentRequest>>,
    pub reflections: Mutex<Vec<ReflectionRequest>>,
    delivery_attempts: AtomicUsize,
    failures_left: AtomicUsize,
    offline: AtomicBool,
    reject_auth: AtomicBool,
    next_moment_id: AtomicUsize,
    today: Mutex<Option<TodayResponse>>,
    moment_page: Mutex<Option<MomentsListResponse>>,
    streaks: Mutex<Option<StreaksResponse>>,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Arc<Notify>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fails the next `n` delivery calls.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Fails every call while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Answers every call with 401 while set.
    pub fn set_reject_auth(&self, reject: bool) {
        self.reject_auth.store(reject, Ordering::SeqCst);
    }

    pub fn set_today(&self, today: TodayResponse) {
        *self.today.lock().unwrap() = Some(today);
    }

    pub fn set_moment_page(&self, page: MomentsListResponse) {
        *self.moment_page.lock().unwrap() = Some(page);
    }

    pub fn set_streaks(&self, streaks: StreaksResponse) {
        *self.streaks.lock().unwrap() = Some(streaks);
    }

    /// Makes the next delivery wait until [`ScriptedApi::release_deliveries`].
    pub fn hold_deliveries(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Lets a held delivery finish; later deliveries no longer wait.
    pub fn release_deliveries(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_one();
        }
    }

    /// Resolves once a delivery has started.
    pub async fn delivery_started(&self) {
        self.entered.notified().await;
    }

    pub fn delivery_attempts(&self) -> usize {
        self.delivery_attempts.load(Ordering::SeqCst)
    }

    fn check(&self) -> AppResult<()> {
        if self.reject_auth.load(Ordering::SeqCst) {
            return Err(unauthorized());
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Api(ApiError::RoutingBackoff));
        }
        Ok(())
    }

    async fn begin_delivery(&self) -> AppResult<()> {
        self.delivery_attempts.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.check()?;
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(server_error());
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn fetch_today(&self) -> AppResult<TodayResponse> {
        self.check()?;
        self.today.lock().unwrap().clone().ok_or_else(server_error)
    }

    async fn submit_mood(&self, request: &MoodRequest) -> AppResult<MoodResponse> {
        self.begin_delivery().await?;
        self.moods.lock().unwrap().push(request.clone());
        Ok(MoodResponse { saved: true })
    }

    async fn capture_moment(&self, request: &MomentRequest) -> AppResult<MomentResponse> {
        self.begin_delivery().await?;
        self.moments.lock().unwrap().push(request.clone());
        let n = self.next_moment_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MomentResponse {
            saved: true,
            id: format!("srv_{}", n),
        })
    }

    async fn fetch_moments(&self, _query: &MomentsQuery) -> AppResult<MomentsListResponse> {
        self.check()?;
        self.moment_page.lock().unwrap().clone().ok_or_else(server_error)
    }

    async fn submit_reflection(&self, request: &ReflectionRequest) -> AppResult<ReflectionResponse> {
        self.check()?;
        self.reflections.lock().unwrap().push(request.clone());
        Ok(ReflectionResponse {
            success: Some(true),
            ..Default::default()
        })
    }

    async fn fetch_streaks(&self) -> AppResult<StreaksResponse> {
        self.check()?;
        self.streaks.lock().unwrap().clone().ok_or_else(server_error)
    }
}

/// A core over an in-memory store, the scripted API and a fixed clock.
pub struct TestCore {
    pub core: JournalCore,
    pub store: Arc<MemoryStore>,
    pub api: Arc<ScriptedApi>,
    pub clock: Arc<ManualClock>,
}

pub fn test_core() -> TestCore {
    let store = Arc::new(MemoryStore::new());
    let api = ScriptedApi::new();
    let clock = fixed_clock();
    let core = JournalCore::new(store.clone(), api.clone(), clock.clone());
    TestCore {
        core,
        store,
        api,
        clock,
    }
}

pub fn today_response(text: &str) -> TodayResponse {
    TodayResponse {
        prompt: Prompt {
            id: "prompt_1".to_string(),
            text: text.to_string(),
            created_at: None,
        },
        has_reflected: Some(false),
        has_reflected_today: None,
        onboarding_completed: Some(true),
        has_mood: Some(false),
        did_swap_prompt: None,
        date_local: Some("2024-03-01".to_string()),
    }
}

pub fn moment_item(id: &str, text: &str, created_at: &str) -> MomentItem {
    MomentItem {
        id: id.to_string(),
        text: Some(text.to_string()),
        image_url: None,
        created_at: created_at.to_string(),
    }
}
