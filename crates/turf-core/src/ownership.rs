//! # Ownership & Authorization
//!
//! Two halves:
//! - [`AccessState`]: what the admin area shows the current caller.
//! - [`OwnerSet`]: the rules a change to the owner set must satisfy.
//!
//! ## Access State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Unauthenticated ──login──► Checking ──resolve──┬──► Admin             │
//! │                                 ▲                ├──► ProfileIncomplete │
//! │                                 │                ├──► Claimable         │
//! │                                 │                └──► AccessDenied      │
//! │                                 │                                       │
//! │   ProfileIncomplete ──save profile──┤                                   │
//! │   Claimable ─────────claim (won or lost)──┤                             │
//! │   AccessDenied ──────emergency reset──────┤                             │
//! │   Admin ─────────────owner set changed────┘                             │
//! │                                                                         │
//! │   Any state ──identity changed──► Checking (or Unauthenticated)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolution order inside `Checking`: admin, then profile, then claimable.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::error::OwnershipRejection;
use crate::types::{Principal, UserRole};
use crate::MAX_OWNERS;

// =============================================================================
// Access State
// =============================================================================

/// What the admin area currently shows the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum AccessState {
    Unauthenticated,
    Checking,
    ProfileIncomplete,
    Claimable,
    AccessDenied,
    Admin,
}

impl AccessState {
    /// `Admin` and `AccessDenied` hold until identity or the owner set
    /// changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AccessState::Admin | AccessState::AccessDenied)
    }

    pub fn is_admin(&self) -> bool {
        *self == AccessState::Admin
    }

    /// Applies an event, refusing transitions the machine does not have.
    ///
    /// ## Example
    /// ```rust
    /// use turf_core::ownership::{AccessEvent, AccessSignals, AccessState};
    ///
    /// let state = AccessState::Unauthenticated.apply(AccessEvent::LoggedIn).unwrap();
    /// assert_eq!(state, AccessState::Checking);
    ///
    /// let signals = AccessSignals::resolved(false, true, true);
    /// let state = state.apply(AccessEvent::Resolved(signals)).unwrap();
    /// assert_eq!(state, AccessState::Claimable);
    /// ```
    pub fn apply(self, event: AccessEvent) -> Result<AccessState, InvalidTransition> {
        use AccessEvent as E;
        use AccessState as S;

        let next = match (self, event) {
            (_, E::LoggedOut) => S::Unauthenticated,
            (_, E::IdentityChanged { authenticated }) => {
                if authenticated {
                    S::Checking
                } else {
                    S::Unauthenticated
                }
            }
            (S::Unauthenticated, E::LoggedIn) => S::Checking,
            (S::Checking, E::Resolved(signals)) => resolve_access(&signals),
            (S::ProfileIncomplete, E::ProfileSaved) => S::Checking,
            (S::Claimable, E::ClaimSettled) => S::Checking,
            (S::AccessDenied, E::ResetSettled) => S::Checking,
            (S::Admin, E::OwnerSetChanged) => S::Checking,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

impl fmt::Display for AccessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AccessState::Unauthenticated => "unauthenticated",
            AccessState::Checking => "checking",
            AccessState::ProfileIncomplete => "profile incomplete",
            AccessState::Claimable => "claimable",
            AccessState::AccessDenied => "access denied",
            AccessState::Admin => "admin",
        };
        f.write_str(text)
    }
}

/// Inputs that move the access state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessEvent {
    LoggedIn,
    LoggedOut,
    IdentityChanged { authenticated: bool },
    /// Answers from the store arrived while `Checking`.
    Resolved(AccessSignals),
    ProfileSaved,
    /// A claim finished, whether it won or lost the race.
    ClaimSettled,
    /// An emergency reset finished, accepted or not.
    ResetSettled,
    /// An owner was added or removed.
    OwnerSetChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No transition from {from} on {event:?}")]
pub struct InvalidTransition {
    pub from: AccessState,
    pub event: AccessEvent,
}

// =============================================================================
// Resolution
// =============================================================================

/// What the store has told us about the caller so far. `None` means the
/// answer is still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessSignals {
    pub authenticated: bool,
    pub is_admin: Option<bool>,
    pub has_profile: Option<bool>,
    pub claimable: Option<bool>,
}

impl AccessSignals {
    /// All answers known for an authenticated caller.
    pub fn resolved(is_admin: bool, has_profile: bool, claimable: bool) -> Self {
        Self {
            authenticated: true,
            is_admin: Some(is_admin),
            has_profile: Some(has_profile),
            claimable: Some(claimable),
        }
    }
}

/// Derives the access state from the signals collected so far.
///
/// An admin answer settles the state on its own; otherwise the profile
/// answer is needed, then the claimable answer.
pub fn resolve_access(signals: &AccessSignals) -> AccessState {
    if !signals.authenticated {
        return AccessState::Unauthenticated;
    }
    match signals.is_admin {
        Some(true) => return AccessState::Admin,
        None => return AccessState::Checking,
        Some(false) => {}
    }
    match signals.has_profile {
        Some(false) => return AccessState::ProfileIncomplete,
        None => return AccessState::Checking,
        Some(true) => {}
    }
    match signals.claimable {
        Some(true) => AccessState::Claimable,
        Some(false) => AccessState::AccessDenied,
        None => AccessState::Checking,
    }
}

// =============================================================================
// Owner Set
// =============================================================================

/// The identities allowed to act as admin. At most [`MAX_OWNERS`].
///
/// Empty means claimable. It only becomes empty through [`OwnerSet::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSet {
    owners: Vec<Principal>,
}

impl OwnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a list the store returned, dropping duplicates.
    pub fn from_owners(owners: impl IntoIterator<Item = Principal>) -> Self {
        let mut set = Self::new();
        for owner in owners {
            if !set.contains(&owner) {
                set.owners.push(owner);
            }
        }
        set
    }

    pub fn owners(&self) -> &[Principal] {
        &self.owners
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn is_claimable(&self) -> bool {
        self.is_empty()
    }

    pub fn contains(&self, principal: &Principal) -> bool {
        self.owners.contains(principal)
    }

    /// Role for a caller; `None` is an anonymous caller.
    pub fn role_of(&self, caller: Option<&Principal>) -> UserRole {
        match caller {
            None => UserRole::Guest,
            Some(p) if self.contains(p) => UserRole::Admin,
            Some(_) => UserRole::User,
        }
    }

    /// Fails with `Unauthorized` unless `caller` is an owner.
    pub fn authorize(&self, caller: &Principal) -> Result<(), OwnershipRejection> {
        if self.contains(caller) {
            Ok(())
        } else {
            Err(OwnershipRejection::Unauthorized)
        }
    }

    /// Checks an addition without applying it. Duplicates are reported
    /// before capacity.
    pub fn check_add(&self, principal: &Principal) -> Result<(), OwnershipRejection> {
        if self.contains(principal) {
            return Err(OwnershipRejection::Duplicate);
        }
        if self.owners.len() >= MAX_OWNERS {
            return Err(OwnershipRejection::Capacity { max: MAX_OWNERS });
        }
        Ok(())
    }

    pub fn add(&mut self, principal: Principal) -> Result<(), OwnershipRejection> {
        self.check_add(&principal)?;
        self.owners.push(principal);
        Ok(())
    }

    /// Checks a removal without applying it.
    pub fn check_remove(&self, principal: &Principal) -> Result<(), OwnershipRejection> {
        if !self.contains(principal) {
            return Err(OwnershipRejection::NotAnOwner);
        }
        if self.owners.len() <= 1 {
            return Err(OwnershipRejection::LastOwner);
        }
        Ok(())
    }

    pub fn remove(&mut self, principal: &Principal) -> Result<(), OwnershipRejection> {
        self.check_remove(principal)?;
        self.owners.retain(|p| p != principal);
        Ok(())
    }

    /// Makes `caller` the sole owner. Only one of several racing claims
    /// can find the set empty.
    pub fn claim(&mut self, caller: Principal) -> Result<(), OwnershipRejection> {
        if !self.is_empty() {
            return Err(OwnershipRejection::AlreadyClaimed);
        }
        self.owners.push(caller);
        Ok(())
    }

    /// Clears the set when `code` matches `secret`, making it claimable.
    pub fn reset(&mut self, code: &str, secret: &str) -> Result<(), OwnershipRejection> {
        if code.is_empty() || code != secret {
            return Err(OwnershipRejection::InvalidResetCode);
        }
        self.owners.clear();
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
