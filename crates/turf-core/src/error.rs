//! # Error Types
//!
//! Domain-specific error types for turf-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  turf-core errors (this file)                                          │
//! │  ├── CoreError           - Slot and calendar rule violations           │
//! │  ├── OwnershipRejection  - Owner-set rule violations                   │
//! │  └── ValidationError     - Input validation failures                   │
//! │                                                                         │
//! │  turf-client errors (separate crate)                                   │
//! │  └── ClientError         - What the presentation layer sees            │
//! │                                                                         │
//! │  Flow: ValidationError → ClientError::Validation                       │
//! │        OwnershipRejection → ClientError::Conflict / Unauthorized       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::date::DateKey;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A booking already occupies the hour.
    ///
    /// ## When This Occurs
    /// - Two callers book the same hour; the store accepts exactly one
    /// - The slot list on screen was stale when the caller picked the hour
    #[error("Slot {date} {hour}:00 is already booked")]
    SlotTaken { date: DateKey, hour: u8 },

    /// An owner has blocked the hour.
    #[error("Slot {date} {hour}:00 is blocked")]
    SlotBlocked { date: DateKey, hour: u8 },

    /// The hour lies outside `[opening, closing)`.
    #[error("Hour {hour} is outside opening hours {opening}-{closing}")]
    OutsideOpeningHours { hour: u8, opening: u8, closing: u8 },

    /// The integer is not a real calendar date.
    #[error("Invalid date key: {0}")]
    InvalidDate(u32),

    /// Owner-set rule violation.
    #[error(transparent)]
    Ownership(#[from] OwnershipRejection),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Ownership Rejection
// =============================================================================

/// Reasons the owner set refuses a change.
///
/// These are the stable, user-facing reasons; the client maps every remote
/// rejection of an ownership call onto one of them.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipRejection {
    /// The identity is already an owner.
    #[error("This principal is already an owner")]
    Duplicate,

    /// The owner set is full.
    #[error("Maximum number of owners ({max}) reached")]
    Capacity { max: usize },

    /// Removing would leave the owner set empty.
    #[error("Cannot remove the last remaining owner")]
    LastOwner,

    /// The identity to remove is not an owner.
    #[error("This principal is not an owner")]
    NotAnOwner,

    /// Claim attempted while the owner set is non-empty.
    #[error("Ownership has already been claimed by someone else")]
    AlreadyClaimed,

    /// The caller is not an owner.
    #[error("Only an owner can perform this action")]
    Unauthorized,

    /// The emergency reset secret did not match.
    #[error("Invalid emergency reset code")]
    InvalidResetCode,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Raised before any remote call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid principal, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Opening hour is not before closing hour.
    #[error("Opening time ({opening}) must be before closing time ({closing})")]
    InvalidTimeRange { opening: u8, closing: u8 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
