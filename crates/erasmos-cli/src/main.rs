//! Erasmos session - keeps an Erasmos login alive from the terminal.
//!
//! Stores the bearer token issued by the Erasmos backend, reports when it
//! expires, and watches the session: warning before expiry, renewing it on
//! request or automatically, and logging out when it runs out.

mod hooks;
mod watch;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use erasmos_core::{Config, Credential, Session, SessionData};

// ============================================================================
// Constants
// ============================================================================

/// Log file written next to the session in the cache directory
const LOG_FILE: &str = "erasmos-session.log";

const USAGE: &str = "Usage: erasmos-session <login <token> | status | logout | watch>";

/// Initialize the tracing subscriber for logging.
/// Returns the guard that flushes the file log; keep it alive until exit.
fn init_tracing(cache_dir: &Path) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::fs::create_dir_all(cache_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(cache_dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load configuration")?;
    let cache_dir = config.cache_dir()?;
    let _log_guard = init_tracing(&cache_dir);
    info!(api = %config.api_base_url, "Erasmos session starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut session = Session::new(cache_dir);

    match args.first().map(String::as_str) {
        Some("login") => {
            let token = args.get(1).context(USAGE)?;
            login(&mut session, token)
        }
        Some("status") => {
            session.load()?;
            status(&session);
            Ok(())
        }
        Some("logout") => {
            session.clear()?;
            eprintln!("Session cleared.");
            Ok(())
        }
        Some("watch") => {
            session.load()?;
            watch::run(&config, session).await
        }
        _ => {
            eprintln!("{}", USAGE);
            Ok(())
        }
    }
}

fn login(session: &mut Session, token: &str) -> Result<()> {
    let credential = Credential::decode(token).context("Token could not be decoded")?;
    if credential.is_expired() {
        anyhow::bail!("Token expired at {}", credential.expires_at());
    }

    session.update(SessionData::from_credential(&credential));
    session.save()?;

    let claims = credential.claims();
    eprintln!(
        "Logged in as {} ({}), token valid until {}",
        claims.email.as_deref().unwrap_or("unknown user"),
        claims.role.as_deref().unwrap_or("no role"),
        credential.expires_at().format("%Y-%m-%d %H:%M:%S UTC"),
    );
    Ok(())
}

fn status(session: &Session) {
    let Some(data) = session.data.as_ref() else {
        eprintln!("Not logged in.");
        return;
    };

    eprintln!("User:    {}", data.email.as_deref().unwrap_or("unknown"));
    eprintln!("User ID: {}", data.user_id.as_deref().unwrap_or("-"));
    eprintln!("Role:    {}", data.role.as_deref().unwrap_or("-"));
    if let Some(expires_at) = session.expires_at() {
        let remaining = expires_at - Utc::now();
        eprintln!(
            "Expires: {} ({}m {}s left)",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
            remaining.num_minutes(),
            remaining.num_seconds() % 60,
        );
    }
}
