use anyhow::Result;
use async_trait::async_trait;

/// Result of a renewal attempt that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A newly issued bearer token
    Renewed(String),
    /// The authentication layer declined to renew
    Declined,
}

/// Callbacks supplied by the authentication layer.
///
/// `refresh` is attempted once per trigger. Returning `Declined` or an error
/// ends the session; the coordinator then calls `logout`.
#[async_trait]
pub trait SessionHooks: Send + Sync + 'static {
    async fn refresh(&self) -> Result<RefreshOutcome>;

    fn logout(&self);
}
