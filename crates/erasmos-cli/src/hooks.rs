//! Session hooks backed by the Erasmos API and the on-disk session.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use erasmos_core::api::ApiError;
use erasmos_core::{ApiClient, Credential, RefreshOutcome, Session, SessionData, SessionHooks};

pub struct ApiSessionHooks {
    api: ApiClient,
    session: Mutex<Session>,
    logged_out: Arc<Notify>,
}

impl ApiSessionHooks {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self {
            api,
            session: Mutex::new(session),
            logged_out: Arc::new(Notify::new()),
        }
    }

    /// Notified once the coordinator forces a logout
    pub fn logged_out(&self) -> Arc<Notify> {
        Arc::clone(&self.logged_out)
    }

    fn current_token(&self) -> Result<String> {
        let session = self.session.lock().map_err(|_| anyhow!("Session lock poisoned"))?;
        session
            .token()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No session token to refresh"))
    }

    fn store_token(&self, credential: &Credential) -> Result<()> {
        let mut session = self.session.lock().map_err(|_| anyhow!("Session lock poisoned"))?;
        session.update(SessionData::from_credential(credential));
        session.save()
    }
}

/// The server refusing the credential is a clean "no", anything else is a failure.
fn outcome_for_error(e: anyhow::Error) -> Result<RefreshOutcome> {
    if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_auth_rejection) {
        warn!(error = %e, "Server declined token renewal");
        return Ok(RefreshOutcome::Declined);
    }
    Err(e)
}

#[async_trait]
impl SessionHooks for ApiSessionHooks {
    async fn refresh(&self) -> Result<RefreshOutcome> {
        let token = self.current_token()?;
        let renewed = match self.api.with_token(token).refresh_token().await {
            Ok(renewed) => renewed,
            Err(e) => return outcome_for_error(e),
        };

        let credential = Credential::decode(&renewed)?;
        if let Err(e) = self.store_token(&credential) {
            warn!(error = %e, "Failed to save renewed session");
        }
        Ok(RefreshOutcome::Renewed(renewed))
    }

    fn logout(&self) {
        match self.session.lock() {
            Ok(mut session) => {
                if let Err(e) = session.clear() {
                    error!(error = %e, "Failed to clear session");
                }
            }
            Err(_) => error!("Session lock poisoned during logout"),
        }
        info!("Logged out");
        self.logged_out.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_auth_rejections_are_declined() {
        let outcome = outcome_for_error(ApiError::Unauthorized.into()).expect("declined");
        assert_eq!(outcome, RefreshOutcome::Declined);

        let outcome = outcome_for_error(ApiError::AccessDenied("role".to_string()).into())
            .expect("declined");
        assert_eq!(outcome, RefreshOutcome::Declined);
    }

    #[test]
    fn test_other_failures_stay_errors() {
        assert!(outcome_for_error(ApiError::ServerError("boom".to_string()).into()).is_err());
        assert!(outcome_for_error(ApiError::RateLimited.into()).is_err());
        assert!(outcome_for_error(anyhow!("connection reset")).is_err());
    }

    #[test]
    fn test_rejection_behind_context_is_declined() {
        let wrapped: anyhow::Error = Err::<(), _>(ApiError::Unauthorized)
            .context("Failed to refresh")
            .unwrap_err();
        assert_eq!(outcome_for_error(wrapped).expect("declined"), RefreshOutcome::Declined);
    }
}
