//! Session lifecycle coordination.
//!
//! A `SessionLifecycleCoordinator` watches one bearer credential at a time.
//! Before the credential expires it publishes a warning with a live
//! countdown, optionally renews the credential silently, and forces a logout
//! when the countdown runs out or a renewal fails.
//!
//! The coordinator runs as a single tokio task that owns every timer.
//! Consumers talk to it through a cloneable `SessionHandle` and read the
//! published `SessionView` from a watch channel.

pub mod clock;
pub mod coordinator;
pub mod handle;
pub mod hooks;
pub mod warning;

use std::time::Duration;

use thiserror::Error;

pub use clock::{Clock, SystemClock};
pub use coordinator::SessionLifecycleCoordinator;
pub use handle::SessionHandle;
pub use hooks::{RefreshOutcome, SessionHooks};
pub use warning::{SessionPhase, SessionView, SessionWarningState};

/// Show the expiry warning this long before the credential expires
pub const WARNING_LEAD: Duration = Duration::from_secs(300);

/// Attempt a silent renewal this long before the credential expires
pub const AUTO_REFRESH_LEAD: Duration = Duration::from_secs(120);

/// Countdown refresh period while the warning is visible
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session coordinator has stopped")]
    Stopped,
}

/// Lead times used when arming a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub warning_lead: Duration,
    pub auto_refresh_lead: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            warning_lead: WARNING_LEAD,
            auto_refresh_lead: AUTO_REFRESH_LEAD,
        }
    }
}

impl SessionTimings {
    pub fn with_warning_lead_secs(mut self, secs: u64) -> Self {
        self.warning_lead = Duration::from_secs(secs);
        self
    }

    pub fn with_auto_refresh_lead_secs(mut self, secs: u64) -> Self {
        self.auto_refresh_lead = Duration::from_secs(secs);
        self
    }
}
