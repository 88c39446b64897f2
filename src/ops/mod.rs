//! User-facing operations of the offline-first core.
//!
//! Writes (mood, moment) land in local state first and are delivered through
//! the outbox. Reads prefer the backend and fall back to the caches. Reflection
//! and streaks are online only.

pub mod moment;
pub mod moments;
pub mod mood;
pub mod reflect;
pub mod streaks;
pub mod sync;
pub mod today;

pub use moment::{capture_moment, CaptureOutcome};
pub use moments::{load_moments, MomentsPage};
pub use mood::{record_mood, MoodOutcome};
pub use reflect::submit_reflection;
pub use streaks::fetch_streaks;
pub use sync::{outbox_status, pending_items, sync_now};
pub use today::{load_today, TodayView};
