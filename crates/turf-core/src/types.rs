//! # Domain Types
//!
//! Core domain types shared by the availability engine, the ownership
//! rules and the client.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TimeSlot     │   │     Booking     │   │   BlockedSlot   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  date (YYYYMMDD)│◄──│  time_slot      │   │  date           │       │
//! │  │  start_hour     │   │  customer/phone │   │  start_hour     │       │
//! │  │  duration       │   │  sport, price   │   │  reason         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  SlotSettings   │   │  PricingRules   │   │ EarningsReport  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  opening_time   │   │  4 hourly rates │   │  start/end date │       │
//! │  │  closing_time   │   │  floodlight hr  │   │  count, revenue │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## One Record Per Hour
//! A `(date, start_hour)` pair is occupied by at most one `Booking` or
//! `BlockedSlot`. The remote store enforces it; the availability engine
//! relies on it.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::date::DateKey;
use crate::error::ValidationError;
use crate::money::Money;
use crate::DEFAULT_SLOT_DURATION_MINUTES;

// =============================================================================
// Principal
// =============================================================================

/// An opaque caller identity issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct Principal(String);

impl Principal {
    pub fn new(text: impl Into<String>) -> Self {
        Principal(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Time Slot
// =============================================================================

/// One bookable unit, identified by `(date, start_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub date: DateKey,

    /// Hour of day, 0-23.
    pub start_hour: u8,

    #[serde(rename = "duration")]
    pub duration_minutes: u16,
}

impl TimeSlot {
    pub fn new(date: DateKey, start_hour: u8, duration_minutes: u16) -> Self {
        Self {
            date,
            start_hour,
            duration_minutes,
        }
    }

    /// Returns true if this slot sits at `(date, hour)`.
    #[inline]
    pub fn occupies(&self, date: DateKey, hour: u8) -> bool {
        self.date == date && self.start_hour == hour
    }
}

// =============================================================================
// Sport
// =============================================================================

/// The sports the turf can be booked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Sport {
    Football,
    Cricket,
}

impl Sport {
    pub const ALL: [Sport; 2] = [Sport::Football, Sport::Cricket];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Football => "Football",
            Sport::Cricket => "Cricket",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "football" => Ok(Sport::Football),
            "cricket" => Ok(Sport::Cricket),
            "" => Err(ValidationError::Required {
                field: "sport".to_string(),
            }),
            _ => Err(ValidationError::NotAllowed {
                field: "sport".to_string(),
                allowed: Sport::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Booking
// =============================================================================

/// A confirmed booking. Created only by the remote store; never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Opaque id issued by the store.
    pub id: String,

    pub time_slot: TimeSlot,

    pub customer_name: String,

    pub phone_number: String,

    pub sport: Sport,

    /// Price charged, fixed at booking time.
    pub price: Money,

    /// Identity that made the booking.
    pub booked_by: Principal,

    #[serde(rename = "timestamp")]
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Booking {
    #[inline]
    pub fn occupies(&self, date: DateKey, hour: u8) -> bool {
        self.time_slot.occupies(date, hour)
    }
}

/// The caller-supplied part of a booking, before the store assigns
/// id, price and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub time_slot: TimeSlot,
    pub customer_name: String,
    pub phone_number: String,
    pub sport: Sport,
}

// =============================================================================
// Blocked Slot
// =============================================================================

/// An hour an owner has taken out of circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BlockedSlot {
    pub date: DateKey,
    pub start_hour: u8,
    pub reason: String,
}

impl BlockedSlot {
    pub fn new(date: DateKey, start_hour: u8, reason: impl Into<String>) -> Self {
        Self {
            date,
            start_hour,
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn occupies(&self, date: DateKey, hour: u8) -> bool {
        self.date == date && self.start_hour == hour
    }
}

// =============================================================================
// Slot Settings
// =============================================================================

/// Opening hours and slot length. Candidate hours are
/// `[opening_time, closing_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SlotSettings {
    pub opening_time: u8,
    pub closing_time: u8,
    #[serde(rename = "slotDuration")]
    pub slot_duration_minutes: u16,
}

impl SlotSettings {
    pub const fn new(opening_time: u8, closing_time: u8, slot_duration_minutes: u16) -> Self {
        Self {
            opening_time,
            closing_time,
            slot_duration_minutes,
        }
    }

    /// Candidate hours. Empty when `opening_time >= closing_time`.
    pub fn hours(&self) -> Range<u8> {
        self.opening_time..self.closing_time.max(self.opening_time)
    }

    #[inline]
    pub fn contains_hour(&self, hour: u8) -> bool {
        self.hours().contains(&hour)
    }
}

impl Default for SlotSettings {
    /// 06:00 to 22:00 in one-hour slots.
    fn default() -> Self {
        Self::new(6, 22, DEFAULT_SLOT_DURATION_MINUTES)
    }
}

// =============================================================================
// Pricing Rules
// =============================================================================

/// Hourly rates by day type and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingRules {
    pub weekday_morning_rate: Money,
    pub weekday_floodlight_rate: Money,
    pub weekend_morning_rate: Money,
    pub weekend_floodlight_rate: Money,

    /// First hour (inclusive) charged at the floodlight rate.
    pub floodlight_start_hour: u8,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            weekday_morning_rate: Money::from_units(300),
            weekday_floodlight_rate: Money::from_units(400),
            weekend_morning_rate: Money::from_units(400),
            weekend_floodlight_rate: Money::from_units(500),
            floodlight_start_hour: 18,
        }
    }
}

// =============================================================================
// Earnings
// =============================================================================

/// Bookings and revenue over an inclusive date range. Always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EarningsReport {
    pub start_date: DateKey,
    pub end_date: DateKey,
    pub booking_count: u32,
    pub total_revenue: Money,
}

// =============================================================================
// Users
// =============================================================================

/// Profile a caller must save before any admin action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub phone_number: String,
}

/// Role of the caller. Admin iff the caller is in the owner set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

// =============================================================================
// Display Helpers
// =============================================================================

/// Formats an hour of day the way the booking screens show it.
///
/// ## Example
/// ```rust
/// use turf_core::types::format_hour;
///
/// assert_eq!(format_hour(0), "12:00 AM");
/// assert_eq!(format_hour(12), "12:00 PM");
/// assert_eq!(format_hour(19), "7:00 PM");
/// ```
pub fn format_hour(hour: u8) -> String {
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{display}:00 {period}")
}

// =============================================================================
// Unit Tests
// =============================================================================
