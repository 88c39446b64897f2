//! Local caches and the outbox queue.
//!
//! Every collection here is persisted wholesale under a fixed key: read the
//! entire value, compute the next state, write the entire value. Each cache
//! serialises its own read-compute-write cycles so concurrent callers never
//! lose each other's writes.
//!
//! # Module Structure
//!
//! - `today_cache`: Derived state for the current local day
//! - `moment_cache`: Bounded, deduplicated moment list with subscribers
//! - `outbox`: Durable queue of pending mood and moment writes

pub mod moment_cache;
pub mod outbox;
pub mod today_cache;

pub use moment_cache::{merge_moments, LocalMoment, MomentCache, Subscription};
pub use outbox::{MomentPayload, OutboxItem, OutboxPayload, OutboxQueue, OutboxStatus};
pub use today_cache::{TodayCache, TodayCacheEntry, TodayUpdate};
