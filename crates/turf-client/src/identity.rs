//! # Identity Session
//!
//! The client only needs two things from the identity provider: who the
//! caller is right now (if anyone), and a way to start an interactive login.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use turf_core::Principal;

use crate::error::{ClientError, ClientResult, DenialReason};

/// Source of the caller identity.
#[async_trait]
pub trait IdentitySession: Send + Sync {
    /// The authenticated caller, or `None`.
    fn principal(&self) -> Option<Principal>;

    /// Runs the interactive login and returns the new identity.
    async fn login(&self) -> ClientResult<Principal>;

    async fn logout(&self);
}

/// An identity session held in process.
///
/// `prepare_login` decides what the next [`IdentitySession::login`] yields,
/// standing in for the provider's login window.
pub struct LocalIdentity {
    current: watch::Sender<Option<Principal>>,
    next_login: watch::Sender<Option<Principal>>,
}

impl LocalIdentity {
    /// Starts signed out.
    pub fn new() -> Self {
        Self {
            current: watch::channel(None).0,
            next_login: watch::channel(None).0,
        }
    }

    /// Starts signed in as `principal`.
    pub fn signed_in(principal: Principal) -> Self {
        let identity = Self::new();
        identity.current.send_replace(Some(principal));
        identity
    }

    pub fn prepare_login(&self, principal: Principal) {
        self.next_login.send_replace(Some(principal));
    }

    /// Swaps identity without a login, like switching accounts in another tab.
    pub fn switch_to(&self, principal: Option<Principal>) {
        self.current.send_replace(principal);
    }

    /// Watches identity changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.current.subscribe()
    }
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentitySession for LocalIdentity {
    fn principal(&self) -> Option<Principal> {
        self.current.borrow().clone()
    }

    async fn login(&self) -> ClientResult<Principal> {
        let principal = self
            .next_login
            .borrow()
            .clone()
            .ok_or(ClientError::Unauthorized(DenialReason::NotAuthenticated))?;
        info!(%principal, "Logged in");
        self.current.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    async fn logout(&self) {
        if let Some(principal) = self.current.send_replace(None) {
            info!(%principal, "Logged out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_requires_prepared_identity() {
        let identity = LocalIdentity::new();
        assert!(identity.principal().is_none());
        assert_eq!(
            identity.login().await,
            Err(ClientError::Unauthorized(DenialReason::NotAuthenticated))
        );

        identity.prepare_login(Principal::new("alice"));
        let p = identity.login().await.unwrap();
        assert_eq!(p, Principal::new("alice"));
        assert_eq!(identity.principal(), Some(p));

        identity.logout().await;
        assert!(identity.principal().is_none());
    }

    #[tokio::test]
    async fn test_switch_notifies_watchers() {
        let identity = LocalIdentity::signed_in(Principal::new("alice"));
        let mut rx = identity.subscribe();

        identity.switch_to(Some(Principal::new("bob")));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(Principal::new("bob")));
    }
}
