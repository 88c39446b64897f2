/*!
# Perspectiv

Offline-first core for a daily-prompt journaling client: today's prompt,
mood ratings, captured moments, reflections and streaks.

Writes are applied to local caches immediately and queued in a durable
outbox; a sync driver delivers them to the backend when authentication and
connectivity allow, retrying failures with exponential backoff. Reads prefer
the backend and fall back to the caches.

## Architecture

- `store`: Durable key-value store trait with file and in-memory backends
- `storage`: Today cache, moment cache and outbox queue on top of the store
- `sync`: Outbox flushing, backoff and lifecycle triggers
- `api`: Remote API gateway (`RemoteApi`) and its HTTP implementation
- `journal_core`: Wiring of the components above
- `ops`: User-facing operations
- `cli`: Command-line surface
- `config`, `errors`, `clock`, `ids`, `constants`: Supporting infrastructure

## Usage Example

```rust,no_run
use perspectiv::{ops, Config, JournalCore};

#[tokio::main]
async fn main() -> perspectiv::AppResult<()> {
    let config = Config::load()?;
    let core = JournalCore::open(&config)?;
    core.start(config.has_token()).await;

    ops::record_mood(&core, 4, vec!["rested".to_string()], None).await?;
    ops::capture_moment(&core, "Coffee with an old friend").await?;
    Ok(())
}
```
*/

/// Remote API gateway
pub mod api;
/// Command-line interface for parsing and running commands
pub mod cli;
/// Injectable time source and date helpers
pub mod clock;
/// Configuration loading and management
pub mod config;
/// Shared constants
pub mod constants;
/// Error types and utilities for error handling
pub mod errors;
/// Identifier generation
pub mod ids;
/// Component wiring
pub mod journal_core;
/// High-level operations
pub mod ops;
/// Caches and the outbox
pub mod storage;
/// Durable key-value stores
pub mod store;
/// Outbox delivery
pub mod sync;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use journal_core::JournalCore;
