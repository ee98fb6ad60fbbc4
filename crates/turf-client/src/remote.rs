//! # Remote Booking Store Contract
//!
//! The operations the client consumes from the booking store. The store is
//! the single source of truth; everything here is a call, nothing is state.
//!
//! ## Seams
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Connector ──connect(caller)──► Arc<dyn BookingBackend>                │
//! │      │                                  │                               │
//! │      │ one backend per identity         │ book, checkAvailability, ...  │
//! │      ▼                                  ▼                               │
//! │   TurfClient reconnects whenever the identity session changes           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authorization
//! | Operation group | Who may call |
//! |---|---|
//! | book, getMyBookings, profile, claim, reset | authenticated caller |
//! | checkAvailability, getBooking, getAllBookings, getBlockedSlots, settings and pricing reads | anyone |
//! | block/unblock, settings and pricing writes, earnings, owners | owner |
//!
//! Emergency reset is gated by a secret, not by role.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use turf_core::{
    BlockedSlot, Booking, DateKey, EarningsReport, PricingRules, Principal, SlotSettings, Sport,
    TimeSlot, UserProfile, UserRole,
};

// =============================================================================
// Remote Error
// =============================================================================

/// How a store call can fail before normalization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The store ran the call and refused it. Carries the store's text.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The store could not be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Rejection texts the store uses.
pub mod traps {
    pub const ONLY_USERS: &str = "Unauthorized: Only users can perform this action";
    pub const ONLY_ADMINS: &str = "Unauthorized: Only admins can perform this action";
    pub const SLOT_BOOKED: &str = "Slot is already booked";
    pub const SLOT_BLOCKED: &str = "Slot is blocked";
    pub const OUTSIDE_HOURS: &str = "Slot is outside opening hours";
    pub const BOOKING_NOT_FOUND: &str = "Booking not found";
    pub const BLOCK_NOT_FOUND: &str = "Blocked slot not found";
    pub const ALREADY_CLAIMED: &str = "Ownership has already been claimed";
    pub const INVALID_RESET_CODE: &str = "Invalid emergency reset code";
    pub const DUPLICATE_OWNER: &str = "Principal is already an owner";
    pub const OWNER_CAPACITY: &str = "Maximum number of owners reached";
    pub const LAST_OWNER: &str = "Cannot remove the last remaining owner";
    pub const NOT_AN_OWNER: &str = "Principal is not an owner";
    pub const INVALID_INPUT: &str = "Invalid input";
}

// =============================================================================
// Booking Backend
// =============================================================================

/// One caller's view of the booking store.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    // -------------------------------------------------------------------------
    // Bookings and availability
    // -------------------------------------------------------------------------

    /// Books `slot` and returns the new booking id.
    async fn book(
        &self,
        slot: TimeSlot,
        customer_name: String,
        phone_number: String,
        sport: Sport,
    ) -> RemoteResult<String>;

    async fn check_availability(&self, date: DateKey) -> RemoteResult<Vec<u8>>;

    async fn get_booking(&self, id: &str) -> RemoteResult<Booking>;

    async fn get_all_bookings(&self) -> RemoteResult<Vec<Booking>>;

    async fn get_my_bookings(&self) -> RemoteResult<Vec<Booking>>;

    // -------------------------------------------------------------------------
    // Blocked slots
    // -------------------------------------------------------------------------

    async fn block_slot(&self, slot: BlockedSlot) -> RemoteResult<()>;

    async fn unblock_slot(&self, date: DateKey, start_hour: u8) -> RemoteResult<()>;

    async fn get_blocked_slots(&self) -> RemoteResult<Vec<BlockedSlot>>;

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    async fn get_slot_settings(&self) -> RemoteResult<SlotSettings>;

    async fn update_slot_settings(&self, settings: SlotSettings) -> RemoteResult<()>;

    async fn get_pricing_rules(&self) -> RemoteResult<PricingRules>;

    async fn update_pricing_rules(&self, rules: PricingRules) -> RemoteResult<()>;

    // -------------------------------------------------------------------------
    // Earnings
    // -------------------------------------------------------------------------

    async fn get_daily_earnings(&self, date: DateKey) -> RemoteResult<EarningsReport>;

    async fn get_weekly_earnings(
        &self,
        start: DateKey,
        end: DateKey,
    ) -> RemoteResult<EarningsReport>;

    // -------------------------------------------------------------------------
    // Caller
    // -------------------------------------------------------------------------

    async fn get_caller_user_role(&self) -> RemoteResult<UserRole>;

    async fn is_caller_admin(&self) -> RemoteResult<bool>;

    async fn get_caller_user_profile(&self) -> RemoteResult<Option<UserProfile>>;

    async fn save_caller_user_profile(&self, profile: UserProfile) -> RemoteResult<()>;

    // -------------------------------------------------------------------------
    // Ownership
    // -------------------------------------------------------------------------

    async fn get_owners(&self) -> RemoteResult<Vec<Principal>>;

    async fn add_owner(&self, principal: Principal) -> RemoteResult<()>;

    async fn remove_owner(&self, principal: Principal) -> RemoteResult<()>;

    async fn is_ownership_claimable(&self) -> RemoteResult<bool>;

    /// Must be exclusive in the store: of several racing claims on an empty
    /// owner set, exactly one wins.
    async fn claim_new_ownership(&self) -> RemoteResult<()>;

    async fn emergency_reset_ownership(&self, code: String) -> RemoteResult<()>;
}

// =============================================================================
// Connector
// =============================================================================

/// Produces a backend bound to a caller identity (`None` is anonymous).
pub trait Connector: Send + Sync {
    fn connect(&self, caller: Option<&Principal>) -> Arc<dyn BookingBackend>;
}
