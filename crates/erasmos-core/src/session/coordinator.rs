//! The session lifecycle state machine.
//!
//! States per credential: `Idle` -> `Armed` -> `Warning` -> `Idle` (logout)
//! or back to `Armed` (successful renewal). Every timer lives in a private
//! field of the coordinator; re-arming clears all of them before scheduling
//! new ones, so no callback can fire against an outdated expiry.

use std::future::pending;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::handle::{Command, SessionHandle};
use super::{
    Clock, RefreshOutcome, SessionError, SessionHooks, SessionPhase, SessionTimings,
    SessionView, SessionWarningState, SystemClock, COUNTDOWN_TICK,
};
use crate::auth::Credential;

/// Buffer size for the command channel.
/// Commands come from a single UI affordance at a time; 16 leaves headroom.
const COMMAND_BUFFER_SIZE: usize = 16;

/// What started a renewal attempt (for logging)
#[derive(Debug, Clone, Copy)]
enum RefreshTrigger {
    Timer,
    User,
}

pub struct SessionLifecycleCoordinator {
    hooks: Arc<dyn SessionHooks>,
    clock: Arc<dyn Clock>,
    timings: SessionTimings,
    auto_refresh_enabled: bool,

    phase: SessionPhase,
    credential: Option<Credential>,
    warning: Option<SessionWarningState>,
    /// Set by `dismiss`; suppresses re-scheduling until the next arm
    dismissed: bool,

    auto_refresh_at: Option<Instant>,
    warning_at: Option<Instant>,
    countdown: Option<Interval>,
    in_flight: Option<BoxFuture<'static, Result<RefreshOutcome>>>,
    refresh_waiters: Vec<oneshot::Sender<SessionPhase>>,

    view_tx: watch::Sender<SessionView>,
}

impl SessionLifecycleCoordinator {
    pub fn new(hooks: Arc<dyn SessionHooks>, timings: SessionTimings) -> Self {
        let (view_tx, _) = watch::channel(SessionView::default());
        Self {
            hooks,
            clock: Arc::new(SystemClock),
            timings,
            auto_refresh_enabled: false,
            phase: SessionPhase::Idle,
            credential: None,
            warning: None,
            dismissed: false,
            auto_refresh_at: None,
            warning_at: None,
            countdown: None,
            in_flight: None,
            refresh_waiters: Vec::new(),
            view_tx,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh_enabled = enabled;
        self
    }

    /// Move the coordinator onto its own task and return a handle to it.
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> SessionHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        self.publish();
        let handle = SessionHandle::new(tx, self.view_tx.subscribe());
        tokio::spawn(self.run(rx));
        handle
    }

    /// Same as `spawn`, arming `token` before returning.
    pub async fn start(self, token: Option<String>) -> Result<SessionHandle, SessionError> {
        let handle = self.spawn();
        if let Some(token) = token {
            handle.arm(token).await?;
        }
        Ok(handle)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        debug!("Session coordinator started");
        loop {
            // Expiry wins over everything else that is ready at the same instant
            tokio::select! {
                biased;

                _ = next_tick(&mut self.countdown) => self.on_tick(),
                result = settle(&mut self.in_flight) => self.on_refresh_settled(result),
                _ = wait_until(self.warning_at) => self.show_warning(),
                _ = wait_until(self.auto_refresh_at) => {
                    self.auto_refresh_at = None;
                    self.begin_refresh(RefreshTrigger::Timer);
                }
                command = rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        self.disarm();
                        break;
                    }
                },
            }

            if self.in_flight.is_none() && !self.refresh_waiters.is_empty() {
                let phase = self.phase;
                for waiter in self.refresh_waiters.drain(..) {
                    let _ = waiter.send(phase);
                }
            }
        }
        debug!("Session coordinator stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Arm(token, reply) => {
                self.arm(&token);
                let _ = reply.send(self.phase);
            }
            Command::Refresh(reply) => {
                self.begin_refresh(RefreshTrigger::User);
                if self.in_flight.is_some() {
                    self.refresh_waiters.push(reply);
                } else {
                    let _ = reply.send(self.phase);
                }
            }
            Command::Dismiss(reply) => {
                self.dismiss();
                let _ = reply.send(self.phase);
            }
            Command::SetAutoRefresh(enabled, reply) => {
                self.set_auto_refresh(enabled.unwrap_or(!self.auto_refresh_enabled));
                let _ = reply.send(self.phase);
            }
            Command::Disarm(reply) => {
                self.disarm();
                let _ = reply.send(self.phase);
            }
        }
    }

    // ===== Transitions =====

    fn arm(&mut self, token: &str) {
        self.cancel_all();
        self.credential = None;
        self.dismissed = false;

        let credential = match Credential::decode(token) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Credential could not be decoded");
                self.force_logout("malformed credential");
                return;
            }
        };

        if credential.is_expired_at(self.clock.now()) {
            self.force_logout("credential already expired");
            return;
        }

        info!(expires_at = %credential.expires_at(), "Arming session timers");
        self.credential = Some(credential);
        self.phase = SessionPhase::Armed;
        self.schedule();
        self.publish();
    }

    /// Schedule auto-refresh and warning deadlines against the current
    /// credential's expiry. Shows the warning at once if its instant has passed.
    fn schedule(&mut self) {
        let Some(expiry) = self.credential.as_ref().map(Credential::expires_at) else {
            return;
        };
        self.clear_deadlines();

        if self.auto_refresh_enabled {
            self.auto_refresh_at = self.deadline_before(expiry, self.timings.auto_refresh_lead);
            if self.auto_refresh_at.is_none() {
                debug!("Auto-refresh instant already passed");
            }
        }

        match self.deadline_before(expiry, self.timings.warning_lead) {
            Some(deadline) => {
                self.warning_at = Some(deadline);
                self.warning = None;
                self.phase = SessionPhase::Armed;
            }
            None => self.show_warning(),
        }
    }

    fn show_warning(&mut self) {
        self.warning_at = None;
        let remaining_seconds = self.remaining_seconds();
        if remaining_seconds == 0 {
            self.force_logout("session expired");
            return;
        }

        info!(remaining_seconds, "Session expiry warning shown");
        self.warning = Some(SessionWarningState {
            remaining_seconds,
            auto_refresh_enabled: self.auto_refresh_enabled,
        });
        self.phase = SessionPhase::Warning;

        let mut countdown = interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.countdown = Some(countdown);
        self.publish();
    }

    fn on_tick(&mut self) {
        let remaining_seconds = self.remaining_seconds();
        if remaining_seconds == 0 {
            self.force_logout("session expired");
            return;
        }
        if let Some(ref mut warning) = self.warning {
            warning.remaining_seconds = remaining_seconds;
        }
        self.publish();
    }

    fn begin_refresh(&mut self, trigger: RefreshTrigger) {
        if self.in_flight.is_some() {
            debug!(?trigger, "Refresh already in flight, ignoring");
            return;
        }
        if self.credential.is_none() {
            debug!(?trigger, "No credential armed, nothing to refresh");
            return;
        }

        info!(?trigger, "Refreshing session credential");
        // Nothing new is scheduled until the attempt settles. A pending warning
        // and the countdown stay armed so expiry still forces a logout.
        self.auto_refresh_at = None;
        let hooks = Arc::clone(&self.hooks);
        self.in_flight = Some(async move { hooks.refresh().await }.boxed());
    }

    fn on_refresh_settled(&mut self, result: Result<RefreshOutcome>) {
        self.in_flight = None;

        let token = match result {
            Ok(RefreshOutcome::Renewed(token)) => token,
            Ok(RefreshOutcome::Declined) => {
                self.force_logout("refresh declined");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                self.force_logout("refresh failed");
                return;
            }
        };

        match Credential::decode(&token) {
            Ok(credential) if !credential.is_expired_at(self.clock.now()) => {
                info!(expires_at = %credential.expires_at(), "Session refreshed, re-arming");
                self.countdown = None;
                self.warning = None;
                self.dismissed = false;
                self.credential = Some(credential);
                self.phase = SessionPhase::Armed;
                self.schedule();
                self.publish();
            }
            Ok(_) => self.force_logout("renewed credential already expired"),
            Err(e) => {
                warn!(error = %e, "Renewed credential could not be decoded");
                self.force_logout("malformed renewed credential");
            }
        }
    }

    fn dismiss(&mut self) {
        if self.credential.is_none() {
            return;
        }
        info!("Session warning dismissed, timers cancelled");
        self.clear_deadlines();
        self.warning = None;
        self.dismissed = true;
        self.phase = SessionPhase::Armed;
        self.publish();
    }

    fn set_auto_refresh(&mut self, enabled: bool) {
        if enabled == self.auto_refresh_enabled {
            return;
        }
        self.auto_refresh_enabled = enabled;
        debug!(enabled, "Auto-refresh preference changed");

        let reschedule = self.credential.is_some() && self.in_flight.is_none() && !self.dismissed;
        if reschedule {
            match self.phase {
                // Same expiry, timers rebuilt from now
                SessionPhase::Warning => self.schedule(),
                SessionPhase::Armed => {
                    self.auto_refresh_at = match (enabled, self.credential.as_ref()) {
                        (true, Some(credential)) => {
                            self.deadline_before(credential.expires_at(), self.timings.auto_refresh_lead)
                        }
                        _ => None,
                    };
                }
                SessionPhase::Idle => {}
            }
        }

        if let Some(ref mut warning) = self.warning {
            warning.auto_refresh_enabled = enabled;
        }
        self.publish();
    }

    fn disarm(&mut self) {
        if self.phase != SessionPhase::Idle {
            debug!("Disarming session timers");
        }
        self.cancel_all();
        self.credential = None;
        self.dismissed = false;
        self.phase = SessionPhase::Idle;
        self.publish();
    }

    /// Terminal path: tear everything down, then tell the auth layer.
    fn force_logout(&mut self, reason: &'static str) {
        warn!(reason, "Forcing logout");
        self.cancel_all();
        self.credential = None;
        self.dismissed = false;
        self.phase = SessionPhase::Idle;
        self.publish();
        self.hooks.logout();
    }

    // ===== Helpers =====

    fn clear_deadlines(&mut self) {
        self.auto_refresh_at = None;
        self.warning_at = None;
        self.countdown = None;
    }

    /// Drops any in-flight refresh; its waiters are answered by the run loop.
    fn cancel_all(&mut self) {
        self.clear_deadlines();
        self.in_flight = None;
        self.warning = None;
    }

    fn remaining_seconds(&self) -> u64 {
        self.credential
            .as_ref()
            .map(|c| c.remaining_at(self.clock.now()).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }

    /// Tokio deadline for `expiry - lead`, or None if that instant has passed.
    fn deadline_before(&self, expiry: DateTime<Utc>, lead: std::time::Duration) -> Option<Instant> {
        let lead = chrono::Duration::from_std(lead).ok()?;
        let at = expiry.checked_sub_signed(lead)?;
        let until = (at - self.clock.now()).to_std().ok()?;
        if until.is_zero() {
            return None;
        }
        Some(Instant::now() + until)
    }

    fn publish(&self) {
        self.view_tx.send_replace(SessionView {
            phase: self.phase,
            warning: self.warning,
            auto_refresh_enabled: self.auto_refresh_enabled,
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(countdown) => {
            countdown.tick().await;
        }
        None => pending().await,
    }
}

async fn settle(in_flight: &mut Option<BoxFuture<'static, Result<RefreshOutcome>>>) -> Result<RefreshOutcome> {
    match in_flight {
        Some(future) => future.await,
        None => pending().await,
    }
}
