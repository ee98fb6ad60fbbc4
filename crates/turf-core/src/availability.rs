//! # Availability & Pricing Engine
//!
//! Turns settings, bookings, blocked slots and pricing rules into what the
//! booking screens show: the free hours of a day and what each one costs.
//!
//! ## Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SlotSettings ──► [opening, closing) ──┐                                │
//! │                                        ▼                                │
//! │  Bookings(date) ──────────────► drop occupied hours ──► free hours      │
//! │  BlockedSlots(date) ──────────────────┘                    │            │
//! │                                                            ▼            │
//! │  PricingRules + is_weekend(date) ────────────────► PricedSlot list     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Missing inputs never price at zero: absent settings give an empty day,
//! absent rules give [`PriceQuote::Unknown`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::date::DateKey;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{BlockedSlot, Booking, EarningsReport, PricingRules, SlotSettings, TimeSlot};

// =============================================================================
// Available Hours
// =============================================================================

/// Hours of `date` that are inside opening hours and carry neither a
/// booking nor a block, ascending.
///
/// Returns an empty list when `settings` is `None` or the range is empty.
pub fn compute_available_hours(
    date: DateKey,
    settings: Option<&SlotSettings>,
    bookings: &[Booking],
    blocked: &[BlockedSlot],
) -> Vec<u8> {
    let Some(settings) = settings else {
        return Vec::new();
    };

    settings
        .hours()
        .filter(|&hour| !is_booked(date, hour, bookings) && !is_blocked(date, hour, blocked))
        .collect()
}

fn is_booked(date: DateKey, hour: u8, bookings: &[Booking]) -> bool {
    bookings.iter().any(|b| b.occupies(date, hour))
}

fn is_blocked(date: DateKey, hour: u8, blocked: &[BlockedSlot]) -> bool {
    blocked.iter().any(|b| b.occupies(date, hour))
}

/// Checks that `slot` can take a new booking or block.
///
/// The store runs the same check before accepting a write.
pub fn check_slot_free(
    slot: &TimeSlot,
    settings: Option<&SlotSettings>,
    bookings: &[Booking],
    blocked: &[BlockedSlot],
) -> CoreResult<()> {
    let (date, hour) = (slot.date, slot.start_hour);
    if !date.is_valid() {
        return Err(CoreError::InvalidDate(date.raw()));
    }
    if let Some(settings) = settings {
        if !settings.contains_hour(hour) {
            return Err(CoreError::OutsideOpeningHours {
                hour,
                opening: settings.opening_time,
                closing: settings.closing_time,
            });
        }
    }
    if is_booked(date, hour, bookings) {
        return Err(CoreError::SlotTaken { date, hour });
    }
    if is_blocked(date, hour, blocked) {
        return Err(CoreError::SlotBlocked { date, hour });
    }
    Ok(())
}

// =============================================================================
// Pricing
// =============================================================================

/// A price, or the marker that rules have not been loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "amount", rename_all = "camelCase")]
pub enum PriceQuote {
    Unknown,
    Known(Money),
}

impl PriceQuote {
    pub fn known(&self) -> Option<Money> {
        match self {
            PriceQuote::Known(m) => Some(*m),
            PriceQuote::Unknown => None,
        }
    }
}

/// Hourly price for `hour`.
///
/// `floodlight_start_hour` itself is charged at the floodlight rate.
///
/// ## Example
/// ```rust
/// use turf_core::availability::{compute_price, PriceQuote};
/// use turf_core::{Money, PricingRules};
///
/// let rules = PricingRules::default();
/// assert_eq!(compute_price(17, Some(&rules), false), PriceQuote::Known(Money::from_units(300)));
/// assert_eq!(compute_price(18, Some(&rules), false), PriceQuote::Known(Money::from_units(400)));
/// assert_eq!(compute_price(18, None, false), PriceQuote::Unknown);
/// ```
pub fn compute_price(hour: u8, rules: Option<&PricingRules>, is_weekend: bool) -> PriceQuote {
    let Some(rules) = rules else {
        return PriceQuote::Unknown;
    };
    let floodlight = hour >= rules.floodlight_start_hour;
    let rate = match (is_weekend, floodlight) {
        (true, true) => rules.weekend_floodlight_rate,
        (true, false) => rules.weekend_morning_rate,
        (false, true) => rules.weekday_floodlight_rate,
        (false, false) => rules.weekday_morning_rate,
    };
    PriceQuote::Known(rate)
}

/// A free hour with its price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedSlot {
    pub hour: u8,
    pub price: PriceQuote,
}

/// Joins hours of `date` with their prices. Weekend is taken from the
/// calendar.
pub fn quote_day(date: DateKey, hours: &[u8], rules: Option<&PricingRules>) -> Vec<PricedSlot> {
    let weekend = date.is_weekend();
    hours
        .iter()
        .map(|&hour| PricedSlot {
            hour,
            price: compute_price(hour, rules, weekend),
        })
        .collect()
}

// =============================================================================
// Admin Slot Board
// =============================================================================

/// What occupies one hour on the admin calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SlotStatus {
    Free,
    Booked { booking: Booking },
    Blocked { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    pub hour: u8,
    pub status: SlotStatus,
}

/// Status of every hour in `[opening, closing)` for `date`.
///
/// A booking wins over a block if the store ever reports both.
pub fn slot_board(
    date: DateKey,
    settings: &SlotSettings,
    bookings: &[Booking],
    blocked: &[BlockedSlot],
) -> Vec<SlotInfo> {
    settings
        .hours()
        .map(|hour| {
            let status = if let Some(booking) = bookings.iter().find(|b| b.occupies(date, hour)) {
                SlotStatus::Booked {
                    booking: booking.clone(),
                }
            } else if let Some(block) = blocked.iter().find(|b| b.occupies(date, hour)) {
                SlotStatus::Blocked {
                    reason: block.reason.clone(),
                }
            } else {
                SlotStatus::Free
            };
            SlotInfo { hour, status }
        })
        .collect()
}

// =============================================================================
// Earnings
// =============================================================================

/// Count and revenue of bookings dated within `[start, end]`.
pub fn compute_earnings(bookings: &[Booking], start: DateKey, end: DateKey) -> EarningsReport {
    let in_range = bookings
        .iter()
        .filter(|b| b.time_slot.date >= start && b.time_slot.date <= end);

    let (count, revenue) = in_range.fold((0u32, Money::zero()), |(n, total), b| {
        (n + 1, total + b.price)
    });

    EarningsReport {
        start_date: start,
        end_date: end,
        booking_count: count,
        total_revenue: revenue,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Principal, Sport};
    use chrono::Utc;

    const SAT: DateKey = DateKey::from_raw(20240601);
    const MON: DateKey = DateKey::from_raw(20240603);

    fn booking(date: DateKey, hour: u8, price: i64) -> Booking {
        Booking {
            id: format!("b-{}-{hour}", date.raw()),
            time_slot: TimeSlot::new(date, hour, 60),
            customer_name: "Asha".to_string(),
            phone_number: "9876543210".to_string(),
            sport: Sport::Football,
            price: Money::from_units(price),
            booked_by: Principal::new("user-a"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_day_is_full_range() {
        let settings = SlotSettings::new(6, 22, 60);
        let hours = compute_available_hours(MON, Some(&settings), &[], &[]);
        assert_eq!(hours, (6..22).collect::<Vec<u8>>());
    }

    #[test]
    fn test_missing_settings_is_empty() {
        assert!(compute_available_hours(MON, None, &[], &[]).is_empty());

        let closed = SlotSettings::new(10, 10, 60);
        assert!(compute_available_hours(MON, Some(&closed), &[], &[]).is_empty());
    }

    #[test]
    fn test_booked_and_blocked_hours_excluded() {
        let settings = SlotSettings::default();
        let bookings = vec![booking(SAT, 18, 500)];
        let blocked = vec![BlockedSlot::new(SAT, 19, "maintenance")];

        let hours = compute_available_hours(SAT, Some(&settings), &bookings, &blocked);
        assert!(!hours.contains(&18));
        assert!(!hours.contains(&19));
        assert!(hours.contains(&17));
        assert!(hours.contains(&20));

        // Records on other dates do not leak
        let hours = compute_available_hours(MON, Some(&settings), &bookings, &blocked);
        assert!(hours.contains(&18) && hours.contains(&19));
    }

    #[test]
    fn test_price_boundaries() {
        let rules = PricingRules::default();
        let price = |h, w| compute_price(h, Some(&rules), w).known().unwrap().units();

        assert_eq!(price(10, false), 300);
        assert_eq!(price(17, false), 300);
        assert_eq!(price(18, false), 400);
        assert_eq!(price(19, false), 400);
        assert_eq!(price(10, true), 400);
        assert_eq!(price(18, true), 500);
    }

    #[test]
    fn test_price_unknown_without_rules() {
        assert_eq!(compute_price(10, None, false), PriceQuote::Unknown);
        let quotes = quote_day(MON, &[10, 19], None);
        assert!(quotes.iter().all(|q| q.price == PriceQuote::Unknown));
    }

    #[test]
    fn test_quote_day_uses_calendar_weekend() {
        let rules = PricingRules::default();
        let weekday = quote_day(MON, &[10, 19], Some(&rules));
        assert_eq!(weekday[0].price.known().unwrap().units(), 300);
        assert_eq!(weekday[1].price.known().unwrap().units(), 400);

        let weekend = quote_day(SAT, &[10, 19], Some(&rules));
        assert_eq!(weekend[0].price.known().unwrap().units(), 400);
        assert_eq!(weekend[1].price.known().unwrap().units(), 500);
    }

    #[test]
    fn test_check_slot_free() {
        let settings = SlotSettings::default();
        let bookings = vec![booking(SAT, 18, 500)];
        let blocked = vec![BlockedSlot::new(SAT, 19, "maintenance")];
        let check = |hour| {
            check_slot_free(
                &TimeSlot::new(SAT, hour, 60),
                Some(&settings),
                &bookings,
                &blocked,
            )
        };

        assert!(check(17).is_ok());
        assert_eq!(check(18), Err(CoreError::SlotTaken { date: SAT, hour: 18 }));
        assert_eq!(check(19), Err(CoreError::SlotBlocked { date: SAT, hour: 19 }));
        assert!(matches!(check(23), Err(CoreError::OutsideOpeningHours { .. })));

        let bad_date = TimeSlot::new(DateKey::from_raw(20240230), 10, 60);
        assert!(matches!(
            check_slot_free(&bad_date, Some(&settings), &[], &[]),
            Err(CoreError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_slot_board() {
        let settings = SlotSettings::new(17, 21, 60);
        let bookings = vec![booking(SAT, 18, 500)];
        let blocked = vec![BlockedSlot::new(SAT, 19, "maintenance")];

        let board = slot_board(SAT, &settings, &bookings, &blocked);
        assert_eq!(board.len(), 4);
        assert_eq!(board[0].status, SlotStatus::Free);
        assert!(matches!(&board[1].status, SlotStatus::Booked { booking } if booking.time_slot.start_hour == 18));
        assert_eq!(
            board[2].status,
            SlotStatus::Blocked {
                reason: "maintenance".to_string()
            }
        );
        assert_eq!(board[3].hour, 20);
    }

    #[test]
    fn test_compute_earnings_inclusive_range() {
        let bookings = vec![
            booking(DateKey::from_raw(20240602), 10, 400),
            booking(DateKey::from_raw(20240603), 10, 300),
            booking(DateKey::from_raw(20240609), 19, 500),
            booking(DateKey::from_raw(20240610), 19, 400),
        ];
        let (start, end) = DateKey::from_raw(20240605).week_bounds().unwrap();

        let report = compute_earnings(&bookings, start, end);
        assert_eq!(report.booking_count, 2);
        assert_eq!(report.total_revenue.units(), 800);
        assert_eq!(report.start_date, start);

        let day = compute_earnings(&bookings, MON, MON);
        assert_eq!(day.booking_count, 1);
    }
}
