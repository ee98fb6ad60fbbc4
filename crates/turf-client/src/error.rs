//! # Client Error Types
//!
//! Every failure the presentation layer can see.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Client Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Validation    │  │  Unauthorized   │  │       Conflict          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Bad input,     │  │  NotAuthentic.  │  │  SlotTaken, SlotBlocked │ │
//! │  │  caught before  │  │  NotAdmin       │  │  AlreadyClaimed         │ │
//! │  │  any remote call│  │  InvalidReset   │  │  Owner-set violations   │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    NotFound     │  │     Failed      │  │      Cancelled          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Unknown booking│  │  Store down,    │  │  View closed before     │ │
//! │  │  id             │  │  timeout, other │  │  the mutation finished  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Normalization
//! The store reports rejections as free text. [`ClientError::from_remote`]
//! maps that text onto the closed set above and logs the raw text; the text
//! itself never reaches the caller.

use std::fmt;

use thiserror::Error;
use tracing::{error, warn};

use turf_core::ownership::InvalidTransition;
use turf_core::{CoreError, OwnershipRejection, ValidationError};

use crate::remote::RemoteError;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

// =============================================================================
// Operation
// =============================================================================

/// Remote operations, named as the store names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Book,
    CheckAvailability,
    GetBooking,
    GetAllBookings,
    GetMyBookings,
    BlockSlot,
    UnblockSlot,
    GetBlockedSlots,
    GetSlotSettings,
    UpdateSlotSettings,
    GetPricingRules,
    UpdatePricingRules,
    GetDailyEarnings,
    GetWeeklyEarnings,
    GetCallerUserRole,
    IsCallerAdmin,
    GetCallerUserProfile,
    SaveCallerUserProfile,
    GetOwners,
    AddOwner,
    RemoveOwner,
    IsOwnershipClaimable,
    ClaimNewOwnership,
    EmergencyResetOwnership,
    Login,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Book => "book",
            Operation::CheckAvailability => "checkAvailability",
            Operation::GetBooking => "getBooking",
            Operation::GetAllBookings => "getAllBookings",
            Operation::GetMyBookings => "getMyBookings",
            Operation::BlockSlot => "blockSlot",
            Operation::UnblockSlot => "unblockSlot",
            Operation::GetBlockedSlots => "getBlockedSlots",
            Operation::GetSlotSettings => "getSlotSettings",
            Operation::UpdateSlotSettings => "updateSlotSettings",
            Operation::GetPricingRules => "getPricingRules",
            Operation::UpdatePricingRules => "updatePricingRules",
            Operation::GetDailyEarnings => "getDailyEarnings",
            Operation::GetWeeklyEarnings => "getWeeklyEarnings",
            Operation::GetCallerUserRole => "getCallerUserRole",
            Operation::IsCallerAdmin => "isCallerAdmin",
            Operation::GetCallerUserProfile => "getCallerUserProfile",
            Operation::SaveCallerUserProfile => "saveCallerUserProfile",
            Operation::GetOwners => "getOwners",
            Operation::AddOwner => "addOwner",
            Operation::RemoveOwner => "removeOwner",
            Operation::IsOwnershipClaimable => "isOwnershipClaimable",
            Operation::ClaimNewOwnership => "claimNewOwnership",
            Operation::EmergencyResetOwnership => "emergencyResetOwnership",
            Operation::Login => "login",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Reasons
// =============================================================================

/// Why the caller was turned away.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    #[error("Please log in to continue")]
    NotAuthenticated,

    #[error("Please complete your profile first")]
    ProfileRequired,

    #[error("Only an owner can perform this action")]
    NotAdmin,

    #[error("Invalid reset code")]
    InvalidResetCode,
}

/// Expected, recoverable clashes with the store's current state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    #[error("This slot has just been booked by someone else")]
    SlotTaken,

    #[error("This slot is not available")]
    SlotBlocked,

    #[error("This slot is outside opening hours")]
    OutsideOpeningHours,

    #[error("Ownership has already been claimed by someone else")]
    AlreadyClaimed,

    #[error("This principal is already an owner")]
    DuplicateOwner,

    #[error("Maximum number of owners ({max}) reached")]
    OwnerCapacity { max: usize },

    #[error("Cannot remove the last remaining owner")]
    LastOwner,

    #[error("This principal is not an owner")]
    NotAnOwner,
}

// =============================================================================
// Client Error
// =============================================================================

/// The closed set of outcomes a failed call can have.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Rejected before any remote call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Unauthorized(DenialReason),

    #[error("{0}")]
    Conflict(ConflictReason),

    #[error("{what} not found")]
    NotFound { what: &'static str },

    /// Transport failure, timeout or an unrecognised rejection. The
    /// operation must not be assumed to have applied.
    #[error("{operation} failed, please try again")]
    Failed { operation: Operation },

    /// The view that started the mutation was closed before it finished.
    #[error("{operation} was cancelled")]
    Cancelled { operation: Operation },
}

impl ClientError {
    /// Maps a store failure onto the closed set.
    ///
    /// ## Text Matching
    /// ```text
    /// "...already been claimed..."        → Conflict(AlreadyClaimed)
    /// "...invalid emergency reset code..."→ Unauthorized(InvalidResetCode)
    /// "...already booked..."              → Conflict(SlotTaken)
    /// "...blocked..."                     → Conflict(SlotBlocked)
    /// "...owner..." rules                 → Conflict(owner-set reason)
    /// "invalid input"                     → Validation
    /// "...not found..."                   → NotFound
    /// "unauthorized..." on claim          → Conflict(AlreadyClaimed)
    /// "unauthorized..." on reset          → Unauthorized(InvalidResetCode)
    /// "unauthorized: only users..."       → Unauthorized(NotAuthenticated)
    /// "unauthorized..." otherwise         → Unauthorized(NotAdmin)
    /// anything else / unreachable store   → Failed
    /// ```
    pub fn from_remote(operation: Operation, err: RemoteError) -> Self {
        let text = match err {
            RemoteError::Unavailable(detail) => {
                error!(%operation, %detail, "Booking store unavailable");
                return ClientError::Failed { operation };
            }
            RemoteError::Rejected(text) => text,
        };

        let lower = text.to_lowercase();
        let mapped = if lower.contains("already been claimed") {
            ClientError::Conflict(ConflictReason::AlreadyClaimed)
        } else if lower.contains("invalid emergency reset code") {
            ClientError::Unauthorized(DenialReason::InvalidResetCode)
        } else if lower.contains("already booked") {
            ClientError::Conflict(ConflictReason::SlotTaken)
        } else if lower.contains("is blocked") {
            ClientError::Conflict(ConflictReason::SlotBlocked)
        } else if lower.contains("outside opening hours") {
            ClientError::Conflict(ConflictReason::OutsideOpeningHours)
        } else if lower.contains("already an owner") {
            ClientError::Conflict(ConflictReason::DuplicateOwner)
        } else if lower.contains("maximum number of owners") {
            ClientError::Conflict(ConflictReason::OwnerCapacity {
                max: turf_core::MAX_OWNERS,
            })
        } else if lower.contains("last remaining owner") || lower.contains("last owner") {
            ClientError::Conflict(ConflictReason::LastOwner)
        } else if lower.contains("not an owner") {
            ClientError::Conflict(ConflictReason::NotAnOwner)
        } else if lower.contains("invalid input") {
            ClientError::Validation(ValidationError::InvalidFormat {
                field: operation.name().to_string(),
                reason: "rejected by the booking store".to_string(),
            })
        } else if lower.contains("not found") {
            ClientError::NotFound {
                what: not_found_subject(operation),
            }
        } else if lower.contains("unauthorized") {
            match operation {
                Operation::ClaimNewOwnership => {
                    ClientError::Conflict(ConflictReason::AlreadyClaimed)
                }
                Operation::EmergencyResetOwnership => {
                    ClientError::Unauthorized(DenialReason::InvalidResetCode)
                }
                _ if lower.contains("only users") || lower.contains("anonymous") => {
                    ClientError::Unauthorized(DenialReason::NotAuthenticated)
                }
                _ => ClientError::Unauthorized(DenialReason::NotAdmin),
            }
        } else {
            ClientError::Failed { operation }
        };

        match &mapped {
            ClientError::Failed { .. } => {
                error!(%operation, rejection = %text, "Unrecognised rejection from booking store")
            }
            other => warn!(%operation, rejection = %text, outcome = ?other, "Booking store rejected call"),
        }
        mapped
    }

    /// Slot or owner-set clash; refetch and let the caller try again.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    /// Returns true if repeating the same call might succeed.
    ///
    /// Only transport-level failures qualify. Mutations are never retried
    /// automatically; this only tells the caller a retry button makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Failed { .. })
    }
}

fn not_found_subject(operation: Operation) -> &'static str {
    match operation {
        Operation::GetBooking => "Booking",
        Operation::UnblockSlot => "Blocked slot",
        Operation::GetCallerUserProfile => "Profile",
        _ => "Record",
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<OwnershipRejection> for ClientError {
    fn from(rejection: OwnershipRejection) -> Self {
        match rejection {
            OwnershipRejection::Duplicate => ClientError::Conflict(ConflictReason::DuplicateOwner),
            OwnershipRejection::Capacity { max } => {
                ClientError::Conflict(ConflictReason::OwnerCapacity { max })
            }
            OwnershipRejection::LastOwner => ClientError::Conflict(ConflictReason::LastOwner),
            OwnershipRejection::NotAnOwner => ClientError::Conflict(ConflictReason::NotAnOwner),
            OwnershipRejection::AlreadyClaimed => {
                ClientError::Conflict(ConflictReason::AlreadyClaimed)
            }
            OwnershipRejection::Unauthorized => ClientError::Unauthorized(DenialReason::NotAdmin),
            OwnershipRejection::InvalidResetCode => {
                ClientError::Unauthorized(DenialReason::InvalidResetCode)
            }
        }
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SlotTaken { .. } => ClientError::Conflict(ConflictReason::SlotTaken),
            CoreError::SlotBlocked { .. } => ClientError::Conflict(ConflictReason::SlotBlocked),
            CoreError::OutsideOpeningHours { .. } => {
                ClientError::Conflict(ConflictReason::OutsideOpeningHours)
            }
            CoreError::InvalidDate(raw) => ClientError::Validation(ValidationError::InvalidFormat {
                field: "date".to_string(),
                reason: format!("{raw} is not a calendar date"),
            }),
            CoreError::Ownership(rejection) => rejection.into(),
            CoreError::Validation(v) => ClientError::Validation(v),
        }
    }
}

/// An access-gate action attempted from a state that does not offer it.
impl From<InvalidTransition> for ClientError {
    fn from(err: InvalidTransition) -> Self {
        use turf_core::ownership::AccessState;

        warn!(from = %err.from, event = ?err.event, "Access action not available");
        match err.from {
            AccessState::Unauthenticated => ClientError::Unauthorized(DenialReason::NotAuthenticated),
            AccessState::ProfileIncomplete => ClientError::Unauthorized(DenialReason::ProfileRequired),
            AccessState::Admin | AccessState::AccessDenied => {
                ClientError::Conflict(ConflictReason::AlreadyClaimed)
            }
            AccessState::Checking | AccessState::Claimable => {
                ClientError::Unauthorized(DenialReason::NotAdmin)
            }
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Failures loading or saving `client.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid client configuration: {0}")]
    Invalid(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::traps;

    fn rejected(op: Operation, text: &str) -> ClientError {
        ClientError::from_remote(op, RemoteError::Rejected(text.to_string()))
    }

    #[test]
    fn test_slot_conflicts() {
        assert_eq!(
            rejected(Operation::Book, traps::SLOT_BOOKED),
            ClientError::Conflict(ConflictReason::SlotTaken)
        );
        assert_eq!(
            rejected(Operation::BlockSlot, traps::SLOT_BLOCKED),
            ClientError::Conflict(ConflictReason::SlotBlocked)
        );
    }

    #[test]
    fn test_unauthorized_depends_on_operation() {
        assert_eq!(
            rejected(Operation::ClaimNewOwnership, "Unauthorized"),
            ClientError::Conflict(ConflictReason::AlreadyClaimed)
        );
        assert_eq!(
            rejected(Operation::EmergencyResetOwnership, "Unauthorized"),
            ClientError::Unauthorized(DenialReason::InvalidResetCode)
        );
        assert_eq!(
            rejected(Operation::AddOwner, traps::ONLY_ADMINS),
            ClientError::Unauthorized(DenialReason::NotAdmin)
        );
        assert_eq!(
            rejected(Operation::Book, traps::ONLY_USERS),
            ClientError::Unauthorized(DenialReason::NotAuthenticated)
        );
    }

    #[test]
    fn test_ownership_texts() {
        assert_eq!(
            rejected(Operation::ClaimNewOwnership, traps::ALREADY_CLAIMED),
            ClientError::Conflict(ConflictReason::AlreadyClaimed)
        );
        assert_eq!(
            rejected(Operation::EmergencyResetOwnership, traps::INVALID_RESET_CODE),
            ClientError::Unauthorized(DenialReason::InvalidResetCode)
        );
        assert_eq!(
            rejected(Operation::RemoveOwner, traps::LAST_OWNER),
            ClientError::Conflict(ConflictReason::LastOwner)
        );
        assert_eq!(
            rejected(Operation::AddOwner, traps::OWNER_CAPACITY),
            ClientError::Conflict(ConflictReason::OwnerCapacity { max: 2 })
        );
        assert_eq!(
            rejected(Operation::AddOwner, traps::DUPLICATE_OWNER),
            ClientError::Conflict(ConflictReason::DuplicateOwner)
        );
    }

    #[test]
    fn test_unknown_and_transport_failures_are_generic() {
        let err = rejected(Operation::UpdateSlotSettings, "trap: stack overflow at 0x2a");
        assert_eq!(
            err,
            ClientError::Failed {
                operation: Operation::UpdateSlotSettings
            }
        );
        assert!(!err.to_string().contains("0x2a"));
        assert!(err.is_retryable());

        let err = ClientError::from_remote(
            Operation::Book,
            RemoteError::Unavailable("connection refused".into()),
        );
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "book failed, please try again");
    }

    #[test]
    fn test_invalid_input_is_not_retryable() {
        let err = rejected(Operation::UpdatePricingRules, traps::INVALID_INPUT);
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::InvalidFormat { .. })
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found() {
        let err = rejected(Operation::GetBooking, traps::BOOKING_NOT_FOUND);
        assert_eq!(err, ClientError::NotFound { what: "Booking" });
        assert_eq!(err.to_string(), "Booking not found");
    }

    #[test]
    fn test_rejection_conversions() {
        let err: ClientError = OwnershipRejection::Capacity { max: 2 }.into();
        assert!(err.is_conflict());
        assert!(!err.is_retryable());

        let err: ClientError = OwnershipRejection::Unauthorized.into();
        assert!(err.is_unauthorized());

        let err: ClientError = CoreError::InvalidDate(20240230).into();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
