/*!
# Perspectiv

Command-line client for the daily prompt, mood and moment journal. Writes are
saved locally first and delivered to the backend through a durable outbox,
so `mood` and `capture` work without a connection.

## Usage

```text
perspectiv today
perspectiv mood <1-5> [--tag TAG]... [--note NOTE]
perspectiv capture <TEXT>
perspectiv moments [--limit N] [--cursor CURSOR]
perspectiv reflect <TEXT>
perspectiv streaks
perspectiv sync
perspectiv outbox
```

## Configuration

- `PERSPECTIV_API_BASE_URL`: Backend origin (defaults to https://b-attic.vercel.app)
- `PERSPECTIV_DIR`: Local data directory (defaults to ~/.local/share/perspectiv)
- `PERSPECTIV_TOKEN`: Bearer token; without it writes stay queued locally
- `PERSPECTIV_LOG_FORMAT`: `text` (default) or `json`
- `RUST_LOG`: Log filter (defaults to `info`)
*/

use clap::Parser;
use perspectiv::cli::{self, CliArgs};
use perspectiv::config::Config;
use perspectiv::constants::{
    DEFAULT_LOG_LEVEL, ENV_VAR_LOG_FORMAT, LOG_FORMAT_JSON, TRACING_ROOT_SPAN_NAME,
    TRACING_SERVICE_NAME,
};
use perspectiv::errors::AppResult;
use perspectiv::JournalCore;
use std::env;
use std::io;
use tracing::{debug, error, info_span, Instrument};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let json = env::var(ENV_VAR_LOG_FORMAT).is_ok_and(|f| f.eq_ignore_ascii_case(LOG_FORMAT_JSON));

    let builder = fmt().with_env_filter(filter).with_writer(io::stderr);
    if json {
        builder.json().with_current_span(true).init();
    } else {
        builder.with_target(false).init();
    }
}

async fn run(args: CliArgs) -> AppResult<()> {
    let config = Config::load()?;
    debug!("Loaded configuration: {:?}", config);

    let core = JournalCore::open(&config)?;
    if args.command.starts_sync() {
        core.start(config.has_token()).await;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::run(&core, args.command, &mut out).await
}

/// Entry point: parses arguments, initialises logging and runs one command
/// inside the `app_invocation` span.
#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_tracing();

    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!(
        TRACING_ROOT_SPAN_NAME,
        service_name = TRACING_SERVICE_NAME,
        correlation_id = %correlation_id
    );

    if let Err(e) = run(args).instrument(span).await {
        error!(correlation_id = %correlation_id, "Command failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
