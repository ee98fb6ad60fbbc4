//! # Invalidation Rules
//!
//! Which cached reads a mutation makes stale.
//!
//! ## Keys and Groups
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  QueryKey carries the parameters the read was fetched with:            │
//! │                                                                         │
//! │     Availability(20240601)   Availability(20240602)   ...              │
//! │            └───────────────┬───────────────┘                            │
//! │                            ▼                                            │
//! │                QueryGroup::Availability                                 │
//! │                                                                         │
//! │  Invalidation::Exact(key)    hits one entry                             │
//! │  Invalidation::Group(group)  hits every entry in the group, whatever   │
//! │                              its parameters                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! The client applies [`Mutation::invalidates`] only after the store has
//! acknowledged the mutation. On a conflict it applies
//! [`Mutation::refresh_on_conflict`] instead so the caller retries against
//! fresh data.

use std::fmt;

use crate::date::DateKey;

// =============================================================================
// Query Keys
// =============================================================================

/// Identity of one cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    SlotSettings,
    PricingRules,
    Availability(DateKey),
    BlockedSlots,
    AllBookings,
    MyBookings,
    Booking(String),
    DailyEarnings(DateKey),
    WeeklyEarnings(DateKey, DateKey),
    IsCallerAdmin,
    OwnershipClaimable,
    Owners,
    CallerProfile,
    CallerRole,
}

/// A family of keys that differ only in their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryGroup {
    SlotSettings,
    PricingRules,
    Availability,
    BlockedSlots,
    AllBookings,
    MyBookings,
    Booking,
    DailyEarnings,
    WeeklyEarnings,
    IsCallerAdmin,
    OwnershipClaimable,
    Owners,
    CallerProfile,
    CallerRole,
}

impl QueryKey {
    pub fn group(&self) -> QueryGroup {
        match self {
            QueryKey::SlotSettings => QueryGroup::SlotSettings,
            QueryKey::PricingRules => QueryGroup::PricingRules,
            QueryKey::Availability(_) => QueryGroup::Availability,
            QueryKey::BlockedSlots => QueryGroup::BlockedSlots,
            QueryKey::AllBookings => QueryGroup::AllBookings,
            QueryKey::MyBookings => QueryGroup::MyBookings,
            QueryKey::Booking(_) => QueryGroup::Booking,
            QueryKey::DailyEarnings(_) => QueryGroup::DailyEarnings,
            QueryKey::WeeklyEarnings(..) => QueryGroup::WeeklyEarnings,
            QueryKey::IsCallerAdmin => QueryGroup::IsCallerAdmin,
            QueryKey::OwnershipClaimable => QueryGroup::OwnershipClaimable,
            QueryKey::Owners => QueryGroup::Owners,
            QueryKey::CallerProfile => QueryGroup::CallerProfile,
            QueryKey::CallerRole => QueryGroup::CallerRole,
        }
    }
}

impl QueryGroup {
    pub fn name(&self) -> &'static str {
        match self {
            QueryGroup::SlotSettings => "slotSettings",
            QueryGroup::PricingRules => "pricingRules",
            QueryGroup::Availability => "availability",
            QueryGroup::BlockedSlots => "blockedSlots",
            QueryGroup::AllBookings => "allBookings",
            QueryGroup::MyBookings => "myBookings",
            QueryGroup::Booking => "booking",
            QueryGroup::DailyEarnings => "dailyEarnings",
            QueryGroup::WeeklyEarnings => "weeklyEarnings",
            QueryGroup::IsCallerAdmin => "isCallerAdmin",
            QueryGroup::OwnershipClaimable => "ownershipClaimable",
            QueryGroup::Owners => "owners",
            QueryGroup::CallerProfile => "currentUserProfile",
            QueryGroup::CallerRole => "callerUserRole",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.group().name();
        match self {
            QueryKey::Availability(d) | QueryKey::DailyEarnings(d) => write!(f, "{name}({d})"),
            QueryKey::WeeklyEarnings(s, e) => write!(f, "{name}({s}..{e})"),
            QueryKey::Booking(id) => write!(f, "{name}({id})"),
            _ => f.write_str(name),
        }
    }
}

// =============================================================================
// Invalidation
// =============================================================================

/// One invalidation instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Exact(QueryKey),
    Group(QueryGroup),
}

impl Invalidation {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Invalidation::Exact(k) => k == key,
            Invalidation::Group(g) => key.group() == *g,
        }
    }
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalidation::Exact(key) => write!(f, "{key}"),
            Invalidation::Group(group) => write!(f, "{}(*)", group.name()),
        }
    }
}

const OWNERSHIP_GROUPS: [QueryGroup; 4] = [
    QueryGroup::IsCallerAdmin,
    QueryGroup::OwnershipClaimable,
    QueryGroup::Owners,
    QueryGroup::CallerRole,
];

// =============================================================================
// Mutations
// =============================================================================

/// Every state-changing call the client makes, with the parameters that
/// decide what it invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Book { date: DateKey },
    BlockSlot { date: DateKey },
    UnblockSlot { date: DateKey },
    UpdateSlotSettings,
    UpdatePricingRules,
    SaveCallerProfile,
    ClaimOwnership,
    EmergencyReset,
    AddOwner,
    RemoveOwner,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Book { .. } => "book",
            Mutation::BlockSlot { .. } => "blockSlot",
            Mutation::UnblockSlot { .. } => "unblockSlot",
            Mutation::UpdateSlotSettings => "updateSlotSettings",
            Mutation::UpdatePricingRules => "updatePricingRules",
            Mutation::SaveCallerProfile => "saveCallerUserProfile",
            Mutation::ClaimOwnership => "claimNewOwnership",
            Mutation::EmergencyReset => "emergencyResetOwnership",
            Mutation::AddOwner => "addOwner",
            Mutation::RemoveOwner => "removeOwner",
        }
    }

    /// Reads made stale once the store acknowledges this mutation.
    ///
    /// ## Example
    /// ```rust
    /// use turf_core::invalidation::{Mutation, QueryKey};
    /// use turf_core::DateKey;
    ///
    /// let d = DateKey::from_raw(20240601);
    /// let stale = Mutation::UpdateSlotSettings.invalidates();
    /// assert!(stale.iter().any(|i| i.matches(&QueryKey::Availability(d))));
    /// ```
    pub fn invalidates(&self) -> Vec<Invalidation> {
        use Invalidation::{Exact, Group};

        match *self {
            Mutation::Book { date } => vec![
                Exact(QueryKey::Availability(date)),
                Group(QueryGroup::AllBookings),
                Group(QueryGroup::MyBookings),
                Group(QueryGroup::DailyEarnings),
                Group(QueryGroup::WeeklyEarnings),
            ],
            Mutation::BlockSlot { date } | Mutation::UnblockSlot { date } => vec![
                Group(QueryGroup::BlockedSlots),
                Exact(QueryKey::Availability(date)),
                Group(QueryGroup::AllBookings),
            ],
            Mutation::UpdateSlotSettings => vec![
                Group(QueryGroup::SlotSettings),
                Group(QueryGroup::Availability),
            ],
            Mutation::UpdatePricingRules => vec![Group(QueryGroup::PricingRules)],
            Mutation::SaveCallerProfile => vec![Group(QueryGroup::CallerProfile)],
            Mutation::ClaimOwnership
            | Mutation::EmergencyReset
            | Mutation::AddOwner
            | Mutation::RemoveOwner => OWNERSHIP_GROUPS.iter().copied().map(Group).collect(),
        }
    }

    /// Reads to refetch when the store rejects this mutation as a conflict.
    pub fn refresh_on_conflict(&self) -> Vec<Invalidation> {
        use Invalidation::{Exact, Group};

        match *self {
            Mutation::Book { date } => vec![
                Exact(QueryKey::Availability(date)),
                Group(QueryGroup::BlockedSlots),
                Group(QueryGroup::AllBookings),
                Group(QueryGroup::MyBookings),
            ],
            Mutation::BlockSlot { date } | Mutation::UnblockSlot { date } => vec![
                Exact(QueryKey::Availability(date)),
                Group(QueryGroup::BlockedSlots),
                Group(QueryGroup::AllBookings),
            ],
            Mutation::ClaimOwnership
            | Mutation::EmergencyReset
            | Mutation::AddOwner
            | Mutation::RemoveOwner => OWNERSHIP_GROUPS.iter().copied().map(Group).collect(),
            Mutation::UpdateSlotSettings
            | Mutation::UpdatePricingRules
            | Mutation::SaveCallerProfile => Vec::new(),
        }
    }

    /// True for calls that change who is an owner.
    pub fn touches_ownership(&self) -> bool {
        matches!(
            self,
            Mutation::ClaimOwnership
                | Mutation::EmergencyReset
                | Mutation::AddOwner
                | Mutation::RemoveOwner
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
