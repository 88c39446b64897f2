//! Constants used throughout the application.
//!
//! This module contains all constants used in the Perspectiv core, organized
//! into logical groups. Having constants centralized makes them easier to find,
//! modify, and reference consistently.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "perspectiv";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "Offline-first daily prompts, moods and moments";

// Configuration Keys & Environment Variables
/// Environment variable for the backend base URL.
pub const ENV_VAR_API_BASE_URL: &str = "PERSPECTIV_API_BASE_URL";
/// Environment variable for the local data directory.
pub const ENV_VAR_PERSPECTIV_DIR: &str = "PERSPECTIV_DIR";
/// Environment variable holding the bearer token.
pub const ENV_VAR_TOKEN: &str = "PERSPECTIV_TOKEN";
/// Environment variable selecting the log output format.
pub const ENV_VAR_LOG_FORMAT: &str = "PERSPECTIV_LOG_FORMAT";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";
/// Backend used when no base URL is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://b-attic.vercel.app";
/// Default sub-directory for cached state within the user's home directory.
pub const DEFAULT_DATA_SUBDIR: &str = ".local/share/perspectiv";
/// Placeholder string for redacted information in debug output.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

// Durable Store Keys
/// Key holding the current day's cached state.
pub const TODAY_CACHE_KEY: &str = "perspectiv.todayCache";
/// Key holding the cached moment list.
pub const MOMENT_CACHE_KEY: &str = "perspectiv.momentCache";
/// Key holding the outbox queue.
pub const OUTBOX_KEY: &str = "perspectiv.outbox";
/// File extension used by the file-backed store.
pub const STORE_FILE_EXTENSION: &str = "json";
/// Name of the advisory lock file inside the data directory.
pub const STORE_LOCK_FILE: &str = ".perspectiv.lock";

// Cache Limits
/// Maximum number of moments retained in the moment cache.
pub const MOMENT_CACHE_LIMIT: usize = 100;
/// Default page size for the moments feed.
pub const DEFAULT_MOMENTS_PAGE_SIZE: usize = 20;
/// Maximum characters in a moment's text.
pub const MAX_MOMENT_TEXT_CHARS: usize = 280;
/// Maximum characters in a mood note.
pub const MAX_MOOD_NOTE_CHARS: usize = 200;
/// Maximum number of tags on a mood.
pub const MAX_MOOD_TAGS: usize = 5;
/// Lowest accepted mood rating.
pub const MIN_MOOD_RATING: u8 = 1;
/// Highest accepted mood rating.
pub const MAX_MOOD_RATING: u8 = 5;

// Outbox Backoff
/// Base retry delay in milliseconds.
pub const OUTBOX_BASE_DELAY_MS: i64 = 1_500;
/// Retry delay ceiling in milliseconds.
pub const OUTBOX_MAX_DELAY_MS: i64 = 60_000;
/// Attempt count after which each failure is logged as a warning.
pub const OUTBOX_WARN_ATTEMPTS: u32 = 10;

// Identifiers
/// Prefix for placeholder moment identifiers.
pub const LOCAL_ID_PREFIX: &str = "local";
/// Prefix for outbox item identifiers.
pub const OUTBOX_ID_PREFIX: &str = "outbox";
/// Number of random characters appended to generated identifiers.
pub const ID_SUFFIX_LEN: usize = 6;
/// Prompt id used when the prompt text comes from the local cache.
pub const LOCAL_PROMPT_ID: &str = "local";

// Remote API
/// Path of the today endpoint.
pub const ENDPOINT_TODAY: &str = "/api/bluum/today";
/// Path of the mood endpoint.
pub const ENDPOINT_MOOD: &str = "/api/bluum/mood";
/// Path of the moment capture endpoint.
pub const ENDPOINT_MOMENT: &str = "/api/bluum/moment";
/// Path of the moments list endpoint.
pub const ENDPOINT_MOMENTS: &str = "/api/bluum/moments";
/// Path of the reflection endpoint.
pub const ENDPOINT_REFLECTION: &str = "/api/bluum/reflection";
/// Path of the streaks endpoint.
pub const ENDPOINT_STREAKS: &str = "/api/bluum/streaks";
/// How long requests fail fast after the backend answered with HTML.
pub const ROUTING_BACKOFF_MS: u64 = 10_000;
/// Error code attached to HTML routing failures.
pub const HTML_RESPONSE_CODE: &str = "HTML_RESPONSE";
/// Error code attached to requests rejected during routing backoff.
pub const ROUTING_BACKOFF_CODE: &str = "ROUTING_BACKOFF";
/// Per-request timeout enforced by the HTTP client.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
/// Number of body characters kept in response logs.
pub const LOG_BODY_PREVIEW_CHARS: usize = 200;

// Date/Time Logic
/// Date format string for ISO date format (YYYY-MM-DD).
pub const DATE_FORMAT_ISO: &str = "%Y-%m-%d";

// Logging Configuration
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Service name used in tracing spans and structured logs.
pub const TRACING_SERVICE_NAME: &str = "perspectiv";
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";
