//! # turf-core: Pure Business Logic for Turf Booking
//!
//! This crate is the **heart** of the turf booking client. It contains the
//! rules the client must get right on its own, because the remote store only
//! enforces coarse invariants.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Turf Booking Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Presentation Layer                           │   │
//! │  │   Date Picker ──► Slot List ──► Booking Form ──► Admin Views    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              turf-client (cache, access gate)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ turf-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐  │   │
//! │  │   │availability│ │ ownership  │ │invalidation│ │ validation │  │   │
//! │  │   │ free hours │ │  access    │ │ mutation → │ │   rules    │  │   │
//! │  │   │  pricing   │ │  states    │ │ stale keys │ │   checks   │  │   │
//! │  │   └────────────┘ └────────────┘ └────────────┘ └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (TimeSlot, Booking, SlotSettings, ...)
//! - [`date`] - `DateKey`, the YYYYMMDD integer wire date
//! - [`money`] - Money type with integer arithmetic
//! - [`availability`] - Free hours, hourly prices, admin slot board, earnings
//! - [`ownership`] - Access state machine and owner-set rules
//! - [`invalidation`] - Which cached reads each mutation makes stale
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation before any remote call
//!
//! ## Example Usage
//!
//! ```rust
//! use turf_core::availability::{compute_available_hours, compute_price, PriceQuote};
//! use turf_core::{DateKey, Money, PricingRules, SlotSettings};
//!
//! let settings = SlotSettings::new(6, 22, 60);
//! let rules = PricingRules::default();
//!
//! let date = DateKey::from_ymd(2024, 6, 3).unwrap(); // a Monday
//! let hours = compute_available_hours(date, Some(&settings), &[], &[]);
//! assert_eq!(hours.first(), Some(&6));
//!
//! let quote = compute_price(19, Some(&rules), date.is_weekend());
//! assert_eq!(quote, PriceQuote::Known(Money::from_units(400)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod date;
pub mod error;
pub mod invalidation;
pub mod money;
pub mod ownership;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use date::DateKey;
pub use error::{CoreError, OwnershipRejection, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of identities that may own the turf at the same time.
pub const MAX_OWNERS: usize = 2;

/// Shortest slot duration an owner may configure, in minutes.
pub const MIN_SLOT_DURATION_MINUTES: u16 = 15;

/// Longest slot duration an owner may configure, in minutes.
pub const MAX_SLOT_DURATION_MINUTES: u16 = 240;

/// Slot duration used when settings have not been fetched yet.
pub const DEFAULT_SLOT_DURATION_MINUTES: u16 = 60;
