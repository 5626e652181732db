//! Interactive session watcher.
//!
//! Arms a coordinator with the stored token and prints the expiry warning as
//! it counts down. Single-letter commands on stdin drive the coordinator.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use erasmos_core::{
    ApiClient, Config, Session, SessionHandle, SessionLifecycleCoordinator, SessionPhase,
    SessionView,
};

use crate::hooks::ApiSessionHooks;

/// A line typed on stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchCommand {
    Refresh,
    Dismiss,
    ToggleAutoRefresh,
    Quit,
}

impl WatchCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "r" | "refresh" => Some(Self::Refresh),
            "d" | "dismiss" => Some(Self::Dismiss),
            "a" | "auto" => Some(Self::ToggleAutoRefresh),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

fn render(view: &SessionView) -> String {
    let auto = if view.auto_refresh_enabled { "on" } else { "off" };
    match (view.phase, view.warning) {
        (SessionPhase::Warning, Some(warning)) => format!(
            "Session expires in {} (auto-refresh {}) - [r]efresh, [d]ismiss, [a]uto, [q]uit",
            warning.remaining_label(),
            auto
        ),
        (SessionPhase::Armed, _) => format!("Session active (auto-refresh {})", auto),
        _ => "No active session".to_string(),
    }
}

pub async fn run(config: &Config, session: Session) -> Result<()> {
    if !session.is_valid() {
        anyhow::bail!("No valid session. Run `erasmos-session login <token>` first.");
    }
    let token = session.token().map(str::to_string).context("Session has no token")?;

    let api = ApiClient::new(&config.api_base_url)?;
    let hooks = Arc::new(ApiSessionHooks::new(api, session));
    let logged_out = hooks.logged_out();

    let handle = SessionLifecycleCoordinator::new(hooks, config.timings())
        .with_auto_refresh(config.auto_refresh_enabled)
        .start(Some(token))
        .await?;

    if handle.view().phase == SessionPhase::Idle {
        eprintln!("Stored session has expired.");
        return Ok(());
    }

    let result = watch_loop(&handle, &logged_out).await;
    handle.disarm().await.ok();
    result
}

async fn watch_loop(handle: &SessionHandle, logged_out: &tokio::sync::Notify) -> Result<()> {
    let mut views = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_line = String::new();

    eprintln!("{}", render(&handle.view()));
    loop {
        tokio::select! {
            _ = logged_out.notified() => {
                eprintln!("Session ended. Please log in again.");
                return Ok(());
            }
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let line = render(&views.borrow_and_update());
                if line != last_line {
                    eprintln!("{}", line);
                    last_line = line;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed, stopping watcher");
                    return Ok(());
                };
                match WatchCommand::parse(&line) {
                    Some(WatchCommand::Refresh) => {
                        let phase = handle.refresh().await?;
                        debug!(?phase, "Manual refresh settled");
                    }
                    Some(WatchCommand::Dismiss) => {
                        handle.dismiss().await?;
                        eprintln!("Warning dismissed. No further warning before expiry.");
                    }
                    Some(WatchCommand::ToggleAutoRefresh) => {
                        handle.toggle_auto_refresh().await?;
                        eprintln!("{}", render(&handle.view()));
                    }
                    Some(WatchCommand::Quit) => return Ok(()),
                    None => eprintln!("Unknown command: {}", line.trim()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erasmos_core::SessionWarningState;

    #[test]
    fn test_parse_commands() {
        assert_eq!(WatchCommand::parse("r"), Some(WatchCommand::Refresh));
        assert_eq!(WatchCommand::parse(" Dismiss \n"), Some(WatchCommand::Dismiss));
        assert_eq!(WatchCommand::parse("a"), Some(WatchCommand::ToggleAutoRefresh));
        assert_eq!(WatchCommand::parse("exit"), Some(WatchCommand::Quit));
        assert_eq!(WatchCommand::parse("x"), None);
    }

    #[test]
    fn test_render() {
        let view = SessionView {
            phase: SessionPhase::Warning,
            warning: Some(SessionWarningState { remaining_seconds: 125, auto_refresh_enabled: false }),
            auto_refresh_enabled: false,
        };
        assert!(render(&view).starts_with("Session expires in 2:05 (auto-refresh off)"));
        assert_eq!(render(&SessionView::default()), "No active session");
    }
}
