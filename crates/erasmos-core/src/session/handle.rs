use tokio::sync::{mpsc, oneshot, watch};

use super::{SessionError, SessionPhase, SessionView, SessionWarningState};

/// Requests sent to the coordinator task. Each carries a reply channel that
/// receives the phase once the request has been applied.
pub(crate) enum Command {
    Arm(String, oneshot::Sender<SessionPhase>),
    Refresh(oneshot::Sender<SessionPhase>),
    Dismiss(oneshot::Sender<SessionPhase>),
    /// `None` toggles the current preference
    SetAutoRefresh(Option<bool>, oneshot::Sender<SessionPhase>),
    Disarm(oneshot::Sender<SessionPhase>),
}

/// Cloneable front end of a running coordinator.
///
/// Dropping every handle disarms the coordinator and ends its task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub(crate) fn new(commands: mpsc::Sender<Command>, view: watch::Receiver<SessionView>) -> Self {
        Self { commands, view }
    }

    /// Start watching a credential, replacing whatever was armed before.
    pub async fn arm(&self, token: impl Into<String>) -> Result<SessionPhase, SessionError> {
        let token = token.into();
        self.request(|reply| Command::Arm(token, reply)).await
    }

    /// Renew the credential now. Resolves once the attempt has settled.
    pub async fn refresh(&self) -> Result<SessionPhase, SessionError> {
        self.request(Command::Refresh).await
    }

    /// Hide the warning and cancel all timers without logging out.
    pub async fn dismiss(&self) -> Result<SessionPhase, SessionError> {
        self.request(Command::Dismiss).await
    }

    pub async fn toggle_auto_refresh(&self) -> Result<SessionPhase, SessionError> {
        self.request(|reply| Command::SetAutoRefresh(None, reply)).await
    }

    pub async fn set_auto_refresh(&self, enabled: bool) -> Result<SessionPhase, SessionError> {
        self.request(|reply| Command::SetAutoRefresh(Some(enabled), reply)).await
    }

    /// Cancel every timer and forget the credential. Safe to call repeatedly.
    pub async fn disarm(&self) -> Result<SessionPhase, SessionError> {
        self.request(Command::Disarm).await
    }

    /// Latest published view
    pub fn view(&self) -> SessionView {
        *self.view.borrow()
    }

    pub fn warning_state(&self) -> Option<SessionWarningState> {
        self.view.borrow().warning
    }

    pub fn auto_refresh_enabled(&self) -> bool {
        self.view.borrow().auto_refresh_enabled
    }

    /// Receiver that wakes on every published change
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<SessionPhase>) -> Command,
    ) -> Result<SessionPhase, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::Stopped)?;
        reply_rx.await.map_err(|_| SessionError::Stopped)
    }
}
