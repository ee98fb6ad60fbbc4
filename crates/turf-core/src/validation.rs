//! # Validation Module
//!
//! Input checks that run before any remote call.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Booking / admin forms                                         │
//! │  └── Immediate feedback on empty fields                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: turf-client, before the remote call                           │
//! │  └── THIS MODULE: ranges, formats, required fields                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Remote store                                                  │
//! │  ├── One record per (date, hour)                                        │
//! │  └── Owner-set rules, admin checks                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators that accept text return the trimmed value to send.

use crate::date::DateKey;
use crate::error::ValidationError;
use crate::types::{
    BookingRequest, PricingRules, Principal, SlotSettings, Sport, TimeSlot, UserProfile,
};
use crate::{MAX_SLOT_DURATION_MINUTES, MIN_SLOT_DURATION_MINUTES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 100;
const MAX_REASON_LEN: usize = 200;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;
const MAX_PRINCIPAL_LEN: usize = 63;

// =============================================================================
// String Validators
// =============================================================================

fn required_trimmed(value: &str, field: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates the name a booking is made under.
///
/// ## Example
/// ```rust
/// use turf_core::validation::validate_customer_name;
///
/// assert_eq!(validate_customer_name("  Asha ").unwrap(), "Asha");
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    required_trimmed(name, "customer name", MAX_NAME_LEN)
}

/// Validates a phone number.
///
/// ## Rules
/// - Must not be empty
/// - Digits, with an optional leading `+` and spaces or hyphens between
/// - 7 to 15 digits
pub fn validate_phone_number(phone: &str) -> ValidationResult<String> {
    let phone = required_trimmed(phone, "phone number", 32)?;

    let body = phone.strip_prefix('+').unwrap_or(&phone);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone number".to_string(),
            reason: "must contain only digits, spaces and hyphens".to_string(),
        });
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < MIN_PHONE_DIGITS {
        return Err(ValidationError::TooShort {
            field: "phone number".to_string(),
            min: MIN_PHONE_DIGITS,
        });
    }
    if digits > MAX_PHONE_DIGITS {
        return Err(ValidationError::TooLong {
            field: "phone number".to_string(),
            max: MAX_PHONE_DIGITS,
        });
    }

    Ok(phone)
}

pub fn validate_sport(sport: &str) -> ValidationResult<Sport> {
    sport.parse()
}

/// Validates the reason attached to a blocked slot.
pub fn validate_block_reason(reason: &str) -> ValidationResult<String> {
    required_trimmed(reason, "reason", MAX_REASON_LEN)
}

/// The emergency reset code is only checked for presence here; the store
/// compares it with the secret.
pub fn validate_reset_code(code: &str) -> ValidationResult<String> {
    required_trimmed(code, "reset code", MAX_REASON_LEN)
}

/// Validates principal text as typed into the owner form.
///
/// ## Rules
/// - Lowercase letters, digits and hyphens
/// - No leading, trailing or doubled hyphen
pub fn validate_principal(text: &str) -> ValidationResult<Principal> {
    let text = required_trimmed(text, "principal", MAX_PRINCIPAL_LEN)?;

    let well_formed = text
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !text.starts_with('-')
        && !text.ends_with('-')
        && !text.contains("--");

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "principal".to_string(),
            reason: "must be lowercase letters and digits in hyphen-separated groups".to_string(),
        });
    }

    Ok(Principal::new(text))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an hour of day (0-23).
pub fn validate_hour(hour: u8) -> ValidationResult<()> {
    if hour > 23 {
        return Err(ValidationError::OutOfRange {
            field: "hour".to_string(),
            min: 0,
            max: 23,
        });
    }
    Ok(())
}

/// Validates slot settings.
///
/// ## Rules
/// - Opening hour 0-23, closing hour up to 24
/// - Opening strictly before closing
/// - Duration 15-240 minutes
///
/// ## Example
/// ```rust
/// use turf_core::validation::validate_slot_settings;
/// use turf_core::SlotSettings;
///
/// assert!(validate_slot_settings(&SlotSettings::new(6, 22, 60)).is_ok());
/// assert!(validate_slot_settings(&SlotSettings::new(22, 6, 60)).is_err());
/// assert!(validate_slot_settings(&SlotSettings::new(6, 22, 300)).is_err());
/// ```
pub fn validate_slot_settings(settings: &SlotSettings) -> ValidationResult<()> {
    if settings.opening_time > 23 {
        return Err(ValidationError::OutOfRange {
            field: "opening time".to_string(),
            min: 0,
            max: 23,
        });
    }

    if settings.closing_time > 24 {
        return Err(ValidationError::OutOfRange {
            field: "closing time".to_string(),
            min: 1,
            max: 24,
        });
    }

    if settings.opening_time >= settings.closing_time {
        return Err(ValidationError::InvalidTimeRange {
            opening: settings.opening_time,
            closing: settings.closing_time,
        });
    }

    if !(MIN_SLOT_DURATION_MINUTES..=MAX_SLOT_DURATION_MINUTES)
        .contains(&settings.slot_duration_minutes)
    {
        return Err(ValidationError::OutOfRange {
            field: "slot duration".to_string(),
            min: MIN_SLOT_DURATION_MINUTES as i64,
            max: MAX_SLOT_DURATION_MINUTES as i64,
        });
    }

    Ok(())
}

/// Validates pricing rules: rates non-negative, floodlight hour 0-23.
pub fn validate_pricing_rules(rules: &PricingRules) -> ValidationResult<()> {
    let rates = [
        ("weekday morning rate", rules.weekday_morning_rate),
        ("weekday floodlight rate", rules.weekday_floodlight_rate),
        ("weekend morning rate", rules.weekend_morning_rate),
        ("weekend floodlight rate", rules.weekend_floodlight_rate),
    ];
    for (field, rate) in rates {
        if rate.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
    }

    if rules.floodlight_start_hour > 23 {
        return Err(ValidationError::OutOfRange {
            field: "floodlight start hour".to_string(),
            min: 0,
            max: 23,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates the date of a new booking against `today`.
pub fn validate_booking_date(
    date: DateKey,
    today: DateKey,
    allow_past: bool,
) -> ValidationResult<()> {
    if !date.is_valid() {
        return Err(ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: format!("{} is not a calendar date", date.raw()),
        });
    }
    if !allow_past && date < today {
        return Err(ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: "cannot book a date in the past".to_string(),
        });
    }
    Ok(())
}

/// Checks every field of a booking form and returns the request to send.
///
/// ## Example
/// ```rust
/// use turf_core::validation::prepare_booking;
/// use turf_core::{DateKey, Sport, TimeSlot};
///
/// let slot = TimeSlot::new(DateKey::from_raw(20240603), 19, 60);
/// let req = prepare_booking(slot, " Asha ", "98765 43210", "Football").unwrap();
/// assert_eq!(req.customer_name, "Asha");
/// assert_eq!(req.sport, Sport::Football);
/// ```
pub fn prepare_booking(
    time_slot: TimeSlot,
    customer_name: &str,
    phone_number: &str,
    sport: &str,
) -> ValidationResult<BookingRequest> {
    validate_hour(time_slot.start_hour)?;
    let customer_name = validate_customer_name(customer_name)?;
    let phone_number = validate_phone_number(phone_number)?;
    let sport = validate_sport(sport)?;

    Ok(BookingRequest {
        time_slot,
        customer_name,
        phone_number,
        sport,
    })
}

/// Trims and checks a profile before it is saved.
pub fn validate_profile(profile: &UserProfile) -> ValidationResult<UserProfile> {
    Ok(UserProfile {
        name: required_trimmed(&profile.name, "name", MAX_NAME_LEN)?,
        phone_number: validate_phone_number(&profile.phone_number)?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
