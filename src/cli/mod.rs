//! Command-line surface for the offline-first core.
//!
//! Parsing is derived with clap; [`run`] executes one command against a
//! [`JournalCore`] and writes human-readable output to the given writer.

use crate::constants::{APP_DESCRIPTION, APP_NAME, DEFAULT_MOMENTS_PAGE_SIZE};
use crate::errors::AppResult;
use crate::journal_core::JournalCore;
use crate::ops;
use crate::sync::FlushReport;
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::io::Write;

/// Daily prompts, moods and moments that keep working offline
#[derive(Parser, Debug)]
#[command(name = APP_NAME, about = APP_DESCRIPTION, version, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show today's prompt and what you've already done today
    Today,

    /// Record today's mood (1-5)
    Mood {
        /// Rating from 1 (low) to 5 (high)
        rating: u8,

        /// Tag the mood; repeat for several tags
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Short note about the mood
        #[arg(long)]
        note: Option<String>,
    },

    /// Capture a moment
    Capture {
        /// What happened
        text: String,
    },

    /// List captured moments, newest first
    Moments {
        /// How many moments to show
        #[arg(long, default_value_t = DEFAULT_MOMENTS_PAGE_SIZE)]
        limit: usize,

        /// Cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,
    },

    /// Reflect on today's prompt (requires a connection)
    Reflect {
        /// Your reflection
        text: String,
    },

    /// Show reflection streaks (requires a connection)
    Streaks,

    /// Deliver queued writes now
    Sync,

    /// Show writes waiting to be delivered
    Outbox,
}

impl Command {
    /// Whether the command should report auth readiness to the core first.
    ///
    /// Becoming ready flushes the outbox, which `outbox` must not do since it
    /// only inspects the queue.
    pub fn starts_sync(&self) -> bool {
        !matches!(self, Command::Outbox)
    }
}

fn format_millis(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

async fn write_flush_summary<W: Write>(
    out: &mut W,
    core: &JournalCore,
    flush: Option<FlushReport>,
) -> AppResult<()> {
    let pending = match flush {
        Some(report) => report.remaining,
        None => core.outbox.status().await?.pending,
    };
    if pending == 0 {
        writeln!(out, "Synced.")?;
    } else {
        writeln!(out, "Saved locally; {} item(s) waiting to sync.", pending)?;
    }
    Ok(())
}

/// Runs `command` against `core`, writing output to `out`.
///
/// # Errors
///
/// Returns the operation's error, or an I/O error if `out` cannot be written.
pub async fn run<W: Write>(core: &JournalCore, command: Command, out: &mut W) -> AppResult<()> {
    match command {
        Command::Today => match ops::load_today(core).await? {
            Some(view) => {
                if view.from_cache {
                    writeln!(out, "(offline, showing saved data)")?;
                }
                writeln!(out, "{}", view.date_local)?;
                if !view.prompt.text.is_empty() {
                    writeln!(out, "Prompt: {}", view.prompt.text)?;
                }
                match (view.has_mood, view.mood_rating) {
                    (true, Some(rating)) => writeln!(out, "Mood: logged ({}/5)", rating)?,
                    (true, None) => writeln!(out, "Mood: logged")?,
                    (false, _) => writeln!(out, "Mood: not logged")?,
                }
                writeln!(
                    out,
                    "Reflection: {}",
                    if view.has_reflected { "done" } else { "not yet" }
                )?;
            }
            None => writeln!(out, "Nothing saved for today yet. Connect to fetch today's prompt.")?,
        },

        Command::Mood {
            rating,
            tags,
            note,
        } => {
            let outcome = ops::record_mood(core, rating, tags, note).await?;
            writeln!(out, "Mood {} recorded.", rating)?;
            write_flush_summary(out, core, outcome.flush).await?;
        }

        Command::Capture { text } => {
            let outcome = ops::capture_moment(core, &text).await?;
            writeln!(out, "Moment captured ({}).", outcome.moment.id)?;
            write_flush_summary(out, core, outcome.flush).await?;
        }

        Command::Moments { limit, cursor } => {
            let page = ops::load_moments(core, limit, cursor).await?;
            if page.from_cache {
                writeln!(out, "(offline, showing saved moments)")?;
            }
            if page.items.is_empty() {
                writeln!(out, "No moments yet.")?;
            }
            for moment in &page.items {
                writeln!(
                    out,
                    "{}  {}{}",
                    moment.created_at,
                    moment.text.as_deref().unwrap_or("[image]"),
                    if moment.pending_sync { "  (pending)" } else { "" }
                )?;
            }
            if let Some(cursor) = page.next_cursor {
                writeln!(out, "More: --cursor {}", cursor)?;
            }
        }

        Command::Reflect { text } => {
            let response = ops::submit_reflection(core, &text).await?;
            let message = response
                .success_message
                .or(response.message)
                .unwrap_or_else(|| "Reflection saved.".to_string());
            writeln!(out, "{}", message)?;
        }

        Command::Streaks => {
            let streaks = ops::fetch_streaks(core).await?;
            writeln!(out, "Current streak: {}", streaks.current_streak)?;
            writeln!(out, "Longest streak: {}", streaks.longest_streak)?;
            writeln!(out, "Total reflections: {}", streaks.total_reflections)?;
            if let Some(date) = streaks.last_reflection_date {
                writeln!(out, "Last reflection: {}", date)?;
            }
        }

        Command::Sync => match ops::sync_now(core).await? {
            Some(report) => writeln!(
                out,
                "Delivered {}, failed {}, not yet due {}, remaining {}.",
                report.delivered, report.failed, report.deferred, report.remaining
            )?,
            None => writeln!(out, "A sync is already running.")?,
        },

        Command::Outbox => {
            let status = ops::outbox_status(core).await?;
            if status.pending == 0 {
                writeln!(out, "Outbox is empty.")?;
                return Ok(());
            }
            writeln!(out, "{} pending, {} due now", status.pending, status.due)?;
            for item in ops::pending_items(core).await? {
                writeln!(
                    out,
                    "{}  {:<6}  attempts {}  next {}",
                    item.id,
                    item.payload.kind(),
                    item.attempts,
                    format_millis(item.next_attempt_at)
                )?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_with_tags_and_note() {
        let args = CliArgs::parse_from([
            "perspectiv",
            "mood",
            "4",
            "--tag",
            "rested",
            "--tag",
            "calm",
            "--note",
            "good sleep",
        ]);
        assert_eq!(
            args.command,
            Command::Mood {
                rating: 4,
                tags: vec!["rested".to_string(), "calm".to_string()],
                note: Some("good sleep".to_string()),
            }
        );
    }

    #[test]
    fn test_moments_defaults() {
        let args = CliArgs::parse_from(["perspectiv", "moments"]);
        assert_eq!(
            args.command,
            Command::Moments {
                limit: DEFAULT_MOMENTS_PAGE_SIZE,
                cursor: None,
            }
        );

        let args = CliArgs::parse_from(["perspectiv", "moments", "--limit", "5", "--cursor", "c2"]);
        assert_eq!(
            args.command,
            Command::Moments {
                limit: 5,
                cursor: Some("c2".to_string()),
            }
        );
    }

    #[test]
    fn test_capture_requires_text() {
        assert!(CliArgs::try_parse_from(["perspectiv", "capture"]).is_err());
        assert!(CliArgs::try_parse_from(["perspectiv"]).is_err());
    }

    #[test]
    fn test_only_outbox_skips_sync_start() {
        assert!(!Command::Outbox.starts_sync());
        assert!(Command::Today.starts_sync());
        assert!(Command::Sync.starts_sync());
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01 00:00:00 UTC");
    }
}
