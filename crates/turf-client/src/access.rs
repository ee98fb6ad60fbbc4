//! # Access Gate
//!
//! Drives the [`AccessState`] machine for the admin area and runs the
//! ownership flows: claim, emergency reset, adding and removing owners.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  identity? ──none──► Unauthenticated                                    │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  Checking ──► isCallerAdmin ┐                                           │
//! │               profile       ├─ joined ──► resolve_access ──► state      │
//! │               claimable     ┘                                           │
//! │                                                                         │
//! │  A read failure leaves the gate in Checking and is returned.            │
//! │  An identity change during the reads restarts resolution.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every ownership flow ends by re-deriving the state from fresh reads,
//! whether the store accepted the call or not. The flow's own outcome is
//! what the caller gets back; if the reads fail after an accepted call the
//! result is `Ok(Checking)` and the caller resolves again. A flow whose view
//! was closed (`Cancelled`) leaves the state untouched.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use turf_core::ownership::{AccessEvent, AccessSignals, AccessState, OwnerSet};
use turf_core::validation::validate_principal;
use turf_core::UserProfile;

use crate::client::TurfClient;
use crate::error::{ClientError, ClientResult, DenialReason};
use crate::scope::ViewScope;

pub struct AccessGate {
    client: Arc<TurfClient>,
    state: watch::Sender<AccessState>,
}

impl AccessGate {
    /// Starts `Unauthenticated`; call [`AccessGate::resolve`] to derive the
    /// real state.
    pub fn new(client: Arc<TurfClient>) -> Self {
        AccessGate {
            client,
            state: watch::channel(AccessState::Unauthenticated).0,
        }
    }

    pub fn client(&self) -> &Arc<TurfClient> {
        &self.client
    }

    pub fn state(&self) -> AccessState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AccessState> {
        self.state.subscribe()
    }

    /// Applies `event` atomically against the current state.
    fn transition(&self, event: AccessEvent) -> ClientResult<AccessState> {
        let mut outcome = Ok(AccessState::Checking);
        let mut previous = AccessState::Checking;

        let changed = self.state.send_if_modified(|state| {
            previous = *state;
            match state.apply(event) {
                Ok(next) => {
                    outcome = Ok(next);
                    let changed = *state != next;
                    *state = next;
                    changed
                }
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            }
        });

        let next = outcome?;
        if changed {
            debug!(from = %previous, to = %next, "Access state changed");
            self.client.emitter().emit_access(next);
        }
        Ok(next)
    }

    /// Applies a settling event if the state still allows it.
    fn settle(&self, event: AccessEvent) {
        if let Err(err) = self.transition(event) {
            debug!(error = %err, "State moved on before the flow settled");
        }
    }

    fn require_admin(&self) -> ClientResult<()> {
        match self.state() {
            AccessState::Admin => Ok(()),
            AccessState::Unauthenticated => {
                Err(ClientError::Unauthorized(DenialReason::NotAuthenticated))
            }
            _ => Err(ClientError::Unauthorized(DenialReason::NotAdmin)),
        }
    }

    /// Checks that the current state offers the flow settled by `event`.
    fn require_offer(&self, event: AccessEvent) -> ClientResult<()> {
        self.state().apply(event)?;
        Ok(())
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Re-derives the state from the identity session and fresh reads.
    pub async fn resolve(&self) -> ClientResult<AccessState> {
        loop {
            let (principal, _) = self.client.sync_identity().await;
            let authenticated = principal.is_some();
            self.transition(AccessEvent::IdentityChanged { authenticated })?;
            if !authenticated {
                return Ok(AccessState::Unauthenticated);
            }

            let (admin, profile, claimable) = tokio::join!(
                self.client.is_caller_admin(),
                self.client.caller_profile(),
                self.client.is_ownership_claimable(),
            );

            if self.client.identity().principal() != principal {
                debug!("Identity changed while resolving access, starting over");
                continue;
            }

            let signals = if admin? {
                AccessSignals {
                    authenticated: true,
                    is_admin: Some(true),
                    ..Default::default()
                }
            } else {
                AccessSignals::resolved(false, profile?.is_some(), claimable?)
            };
            let state = self.transition(AccessEvent::Resolved(signals))?;
            info!(
                principal = ?principal.as_ref().map(|p| p.as_str()),
                %state,
                "Access resolved"
            );
            return Ok(state);
        }
    }

    pub async fn login(&self) -> ClientResult<AccessState> {
        self.client.identity().login().await?;
        self.resolve().await
    }

    pub async fn logout(&self) -> ClientResult<AccessState> {
        self.client.identity().logout().await;
        self.client.sync_identity().await;
        self.transition(AccessEvent::LoggedOut)
    }

    // =========================================================================
    // Flows
    // =========================================================================

    /// Saves the caller's profile; from `ProfileIncomplete` this moves on
    /// to the next check.
    pub async fn save_profile(
        &self,
        scope: &ViewScope,
        profile: &UserProfile,
    ) -> ClientResult<AccessState> {
        self.client.save_profile(scope, profile).await?;

        if self.state() == AccessState::ProfileIncomplete {
            self.transition(AccessEvent::ProfileSaved)?;
            return self.resolve().await;
        }
        Ok(self.state())
    }

    /// Claims ownership of an unclaimed turf.
    ///
    /// Exactly one of several racing claimants wins in the store. The
    /// losers get `Conflict(AlreadyClaimed)` and end up in `AccessDenied`.
    pub async fn claim(&self, scope: &ViewScope) -> ClientResult<AccessState> {
        self.require_offer(AccessEvent::ClaimSettled)?;

        let result = self.client.claim_new_ownership(scope).await;
        self.finish(AccessEvent::ClaimSettled, result).await
    }

    /// Clears the owner set with the out-of-band reset code.
    pub async fn emergency_reset(&self, scope: &ViewScope, code: &str) -> ClientResult<AccessState> {
        self.require_offer(AccessEvent::ResetSettled)?;

        let result = self.client.emergency_reset_ownership(scope, code).await;
        if result.is_ok() {
            warn!("Owner set was cleared by emergency reset");
        }
        self.finish(AccessEvent::ResetSettled, result).await
    }

    /// Reset followed by a claim. Succeeds only if both steps do; if the
    /// claim is lost after the reset, the claim's error is returned and the
    /// state reflects whoever won.
    pub async fn reset_and_claim(&self, scope: &ViewScope, code: &str) -> ClientResult<AccessState> {
        self.emergency_reset(scope, code).await?;
        self.claim(scope).await
    }

    pub async fn add_owner(&self, scope: &ViewScope, principal: &str) -> ClientResult<AccessState> {
        self.require_admin()?;
        let candidate = validate_principal(principal)?;

        let owners = OwnerSet::from_owners(self.client.owners().await?);
        owners.check_add(&candidate)?;

        let result = self.client.add_owner(scope, candidate.as_str()).await;
        self.finish(AccessEvent::OwnerSetChanged, result).await
    }

    /// Removes an owner. Removing yourself is allowed while another owner
    /// remains; the gate then settles in `AccessDenied`.
    pub async fn remove_owner(
        &self,
        scope: &ViewScope,
        principal: &str,
    ) -> ClientResult<AccessState> {
        self.require_admin()?;
        let target = validate_principal(principal)?;

        let owners = OwnerSet::from_owners(self.client.owners().await?);
        owners.check_remove(&target)?;

        let result = self.client.remove_owner(scope, target.as_str()).await;
        self.finish(AccessEvent::OwnerSetChanged, result).await
    }

    /// Settles a flow and re-derives the state.
    ///
    /// The store's answer always wins over a failed re-derivation: a
    /// rejection is returned as is, and an accepted call returns `Ok` with
    /// the gate left in `Checking` until the next [`AccessGate::resolve`].
    async fn finish(
        &self,
        event: AccessEvent,
        result: ClientResult<()>,
    ) -> ClientResult<AccessState> {
        if let Err(ClientError::Cancelled { .. }) = result {
            return result.map(|_| self.state());
        }
        self.settle(event);

        match (result, self.resolve().await) {
            (Err(e), resolved) => {
                if let Err(read) = resolved {
                    warn!(error = %read, "Could not re-derive access after a rejected flow");
                }
                Err(e)
            }
            (Ok(()), Ok(state)) => Ok(state),
            (Ok(()), Err(read)) => {
                warn!(error = %read, "Flow accepted but access could not be re-derived");
                Ok(self.state())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::client::{ClientEventEmitter, TurfClientBuilder};
    use crate::config::ClientConfig;
    use crate::error::{ConflictReason, Operation};
    use crate::identity::{IdentitySession, LocalIdentity};
    use crate::memory::MemoryStore;
    use turf_core::invalidation::Mutation;
    use turf_core::Principal;

    const SECRET: &str = "open-sesame";

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            name: name.to_string(),
            phone_number: "9876543210".to_string(),
        }
    }

    fn store_with_profiles(owners: &[&str]) -> MemoryStore {
        MemoryStore::builder()
            .owners(owners.iter().copied())
            .profile("alice", profile("Alice"))
            .profile("bob", profile("Bob"))
            .profile("carol", profile("Carol"))
            .reset_secret(SECRET)
            .build()
    }

    fn gate_for(store: &MemoryStore, who: Option<&str>) -> (Arc<LocalIdentity>, AccessGate) {
        let identity = Arc::new(match who {
            Some(name) => LocalIdentity::signed_in(Principal::new(name)),
            None => LocalIdentity::new(),
        });
        let client = TurfClient::new(
            ClientConfig::default(),
            identity.clone(),
            Arc::new(store.clone()),
        );
        (identity, AccessGate::new(Arc::new(client)))
    }

    #[derive(Default)]
    struct StateLog(StdMutex<Vec<AccessState>>);

    impl ClientEventEmitter for StateLog {
        fn emit_access(&self, state: AccessState) {
            self.0.lock().unwrap().push(state);
        }
        fn emit_invalidated(&self, _mutation: Mutation, _removed: usize) {}
        fn emit_error(&self, _operation: Operation, _message: &str, _retryable: bool) {}
    }

    /// Takes the store offline as soon as an ownership call has been
    /// answered, so the follow-up reads fail.
    struct OutageAfterClaim(MemoryStore);

    impl ClientEventEmitter for OutageAfterClaim {
        fn emit_access(&self, _state: AccessState) {}
        fn emit_invalidated(&self, _mutation: Mutation, _removed: usize) {
            self.0.set_available(false);
        }
        fn emit_error(&self, operation: Operation, _message: &str, _retryable: bool) {
            if operation == Operation::ClaimNewOwnership {
                self.0.set_available(false);
            }
        }
    }

    fn gate_with_outage(store: &MemoryStore, who: &str) -> AccessGate {
        let client = TurfClientBuilder::new(ClientConfig::default())
            .with_identity(Arc::new(LocalIdentity::signed_in(Principal::new(who))))
            .with_connector(Arc::new(store.clone()))
            .with_emitter(Arc::new(OutageAfterClaim(store.clone())))
            .build()
            .unwrap();
        AccessGate::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_first_visit_to_admin() {
        let store = MemoryStore::builder().reset_secret(SECRET).build();
        let identity = Arc::new(LocalIdentity::new());
        let log = Arc::new(StateLog::default());
        let client = TurfClientBuilder::new(ClientConfig::default())
            .with_identity(identity.clone())
            .with_connector(Arc::new(store.clone()))
            .with_emitter(log.clone())
            .build()
            .unwrap();
        let gate = AccessGate::new(Arc::new(client));

        assert_eq!(gate.resolve().await.unwrap(), AccessState::Unauthenticated);

        identity.prepare_login(Principal::new("alice"));
        assert_eq!(gate.login().await.unwrap(), AccessState::ProfileIncomplete);

        let scope = ViewScope::new();
        let state = gate.save_profile(&scope, &profile("Alice")).await.unwrap();
        assert_eq!(state, AccessState::Claimable);

        assert_eq!(gate.claim(&scope).await.unwrap(), AccessState::Admin);
        assert_eq!(store.owners().await, vec![Principal::new("alice")]);

        let states = log.0.lock().unwrap().clone();
        assert_eq!(states.first(), Some(&AccessState::Checking));
        assert_eq!(states.last(), Some(&AccessState::Admin));
        assert!(states.contains(&AccessState::ProfileIncomplete));
        assert!(states.contains(&AccessState::Claimable));
    }

    #[tokio::test]
    async fn test_claim_race_has_one_admin() {
        let store = store_with_profiles(&[]);
        let (_, alice) = gate_for(&store, Some("alice"));
        let (_, bob) = gate_for(&store, Some("bob"));

        assert_eq!(alice.resolve().await.unwrap(), AccessState::Claimable);
        assert_eq!(bob.resolve().await.unwrap(), AccessState::Claimable);

        let scope = ViewScope::new();
        let (a, b) = tokio::join!(alice.claim(&scope), bob.claim(&scope));

        let outcomes = [a, b];
        let winners = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(outcomes
            .iter()
            .any(|r| *r == Err(ClientError::Conflict(ConflictReason::AlreadyClaimed))));

        let mut states = [alice.state(), bob.state()];
        states.sort_by_key(|s| s.is_admin());
        assert_eq!(states, [AccessState::AccessDenied, AccessState::Admin]);
        assert_eq!(store.owners().await.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_not_offered_when_denied() {
        let store = store_with_profiles(&["alice"]);
        let (_, bob) = gate_for(&store, Some("bob"));
        assert_eq!(bob.resolve().await.unwrap(), AccessState::AccessDenied);

        let calls = store.call_count();
        let err = bob.claim(&ViewScope::new()).await.unwrap_err();
        assert_eq!(err, ClientError::Conflict(ConflictReason::AlreadyClaimed));
        assert_eq!(store.call_count(), calls);
    }

    #[tokio::test]
    async fn test_cancelled_claim_leaves_state() {
        let store = store_with_profiles(&[]);
        let (_, alice) = gate_for(&store, Some("alice"));
        alice.resolve().await.unwrap();

        let scope = ViewScope::new();
        scope.close();
        let err = alice.claim(&scope).await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled { .. }));
        assert_eq!(alice.state(), AccessState::Claimable);
        assert!(store.owners().await.is_empty());
    }

    #[tokio::test]
    async fn test_emergency_reset() {
        let store = store_with_profiles(&["alice"]);
        let (_, bob) = gate_for(&store, Some("bob"));
        bob.resolve().await.unwrap();

        let scope = ViewScope::new();
        let err = bob.emergency_reset(&scope, "guess").await.unwrap_err();
        assert_eq!(err, ClientError::Unauthorized(DenialReason::InvalidResetCode));
        assert_eq!(bob.state(), AccessState::AccessDenied);
        assert_eq!(store.owners().await.len(), 1);

        assert_eq!(
            bob.emergency_reset(&scope, SECRET).await.unwrap(),
            AccessState::Claimable
        );
        assert!(store.owners().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_and_claim() {
        let store = store_with_profiles(&["alice"]);
        let (_, bob) = gate_for(&store, Some("bob"));
        bob.resolve().await.unwrap();

        let scope = ViewScope::new();
        assert!(bob.reset_and_claim(&scope, "").await.is_err());
        assert_eq!(bob.state(), AccessState::AccessDenied);

        assert_eq!(
            bob.reset_and_claim(&scope, SECRET).await.unwrap(),
            AccessState::Admin
        );
        assert_eq!(store.owners().await, vec![Principal::new("bob")]);
    }

    #[tokio::test]
    async fn test_owner_management() {
        let store = store_with_profiles(&["alice"]);
        let (_, alice) = gate_for(&store, Some("alice"));
        let (_, bob) = gate_for(&store, Some("bob"));
        let scope = ViewScope::new();

        assert_eq!(
            bob.add_owner(&scope, "carol").await,
            Err(ClientError::Unauthorized(DenialReason::NotAuthenticated))
        );

        alice.resolve().await.unwrap();
        assert_eq!(
            alice.remove_owner(&scope, "alice").await,
            Err(ClientError::Conflict(ConflictReason::LastOwner))
        );
        assert_eq!(alice.add_owner(&scope, "bob").await.unwrap(), AccessState::Admin);

        // Capacity is checked before the store is asked
        assert_eq!(
            alice.add_owner(&scope, "carol").await,
            Err(ClientError::Conflict(ConflictReason::OwnerCapacity { max: 2 }))
        );
        assert!(matches!(
            alice.add_owner(&scope, "Not A Principal").await,
            Err(ClientError::Validation(_))
        ));

        assert_eq!(bob.resolve().await.unwrap(), AccessState::Admin);

        // Stepping down leaves the other owner in charge
        assert_eq!(
            alice.remove_owner(&scope, "alice").await.unwrap(),
            AccessState::AccessDenied
        );
        assert_eq!(store.owners().await, vec![Principal::new("bob")]);
    }

    #[tokio::test]
    async fn test_identity_switch_rederives() {
        let store = store_with_profiles(&["alice"]);
        let (identity, gate) = gate_for(&store, Some("alice"));
        let mut rx = gate.subscribe();

        assert_eq!(gate.resolve().await.unwrap(), AccessState::Admin);
        assert_eq!(*rx.borrow_and_update(), AccessState::Admin);

        identity.switch_to(Some(Principal::new("bob")));
        assert_eq!(gate.resolve().await.unwrap(), AccessState::AccessDenied);

        assert_eq!(gate.logout().await.unwrap(), AccessState::Unauthenticated);
        assert!(identity.principal().is_none());
    }

    #[tokio::test]
    async fn test_resolve_read_failure_stays_checking() {
        let store = store_with_profiles(&["alice"]);
        let (_, alice) = gate_for(&store, Some("alice"));

        store.set_available(false);
        let err = alice.resolve().await.unwrap_err();
        assert!(matches!(err, ClientError::Failed { .. }));
        assert_eq!(alice.state(), AccessState::Checking);

        store.set_available(true);
        assert_eq!(alice.resolve().await.unwrap(), AccessState::Admin);
    }

    #[tokio::test]
    async fn test_accepted_claim_survives_failed_rederive() {
        let store = store_with_profiles(&[]);
        let alice = gate_with_outage(&store, "alice");
        assert_eq!(alice.resolve().await.unwrap(), AccessState::Claimable);

        let state = alice.claim(&ViewScope::new()).await.unwrap();
        assert_eq!(state, AccessState::Checking);
        assert_eq!(alice.state(), AccessState::Checking);
        assert_eq!(store.owners().await, vec![Principal::new("alice")]);

        store.set_available(true);
        assert_eq!(alice.resolve().await.unwrap(), AccessState::Admin);
    }

    #[tokio::test]
    async fn test_lost_claim_reported_over_failed_rederive() {
        let store = store_with_profiles(&[]);
        let (_, alice) = gate_for(&store, Some("alice"));
        let bob = gate_with_outage(&store, "bob");
        assert_eq!(alice.resolve().await.unwrap(), AccessState::Claimable);
        assert_eq!(bob.resolve().await.unwrap(), AccessState::Claimable);

        let scope = ViewScope::new();
        assert_eq!(alice.claim(&scope).await.unwrap(), AccessState::Admin);

        let err = bob.claim(&scope).await.unwrap_err();
        assert_eq!(err, ClientError::Conflict(ConflictReason::AlreadyClaimed));
        assert_eq!(bob.state(), AccessState::Checking);
    }
}
