//! # Query Cache
//!
//! Read-through cache of store answers, keyed by [`QueryKey`].
//!
//! ## Stale In-Flight Reads
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  t0  read availability(D) starts      ticket = epoch 7                  │
//! │  t1  book(D, 19) acknowledged          invalidate → epoch 8             │
//! │  t2  read from t0 returns (still has 19)                                │
//! │      store(key, value, ticket 7) → refused, epoch is 8                  │
//! │                                                                         │
//! │  The value is still handed to the reader that asked for it, but it     │
//! │  never lands in the cache where a later reader would see hour 19.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the client writes here, and only with values the store returned.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use turf_core::invalidation::{Invalidation, QueryKey};
use turf_core::{
    BlockedSlot, Booking, EarningsReport, PricingRules, Principal, SlotSettings, UserProfile,
    UserRole,
};

// =============================================================================
// Cached Values
// =============================================================================

/// Everything the store can answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Settings(SlotSettings),
    Pricing(PricingRules),
    Hours(Vec<u8>),
    Blocked(Vec<BlockedSlot>),
    Bookings(Vec<Booking>),
    Booking(Booking),
    Earnings(EarningsReport),
    Flag(bool),
    Owners(Vec<Principal>),
    Profile(Option<UserProfile>),
    Role(UserRole),
}

/// Types that can be stored in the cache.
pub trait Cacheable: Clone + Sized {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

macro_rules! cacheable {
    ($ty:ty, $variant:ident) => {
        impl Cacheable for $ty {
            fn into_cached(self) -> CachedValue {
                CachedValue::$variant(self)
            }

            fn from_cached(value: &CachedValue) -> Option<Self> {
                match value {
                    CachedValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(SlotSettings, Settings);
cacheable!(PricingRules, Pricing);
cacheable!(Vec<u8>, Hours);
cacheable!(Vec<BlockedSlot>, Blocked);
cacheable!(Vec<Booking>, Bookings);
cacheable!(Booking, Booking);
cacheable!(EarningsReport, Earnings);
cacheable!(bool, Flag);
cacheable!(Vec<Principal>, Owners);
cacheable!(Option<UserProfile>, Profile);
cacheable!(UserRole, Role);

// =============================================================================
// Query Cache
// =============================================================================

/// Marks when a read started, so a slow answer cannot overwrite a newer
/// invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Default)]
struct CacheInner {
    entries: HashMap<QueryKey, CachedValue>,
    epoch: u64,
}

#[derive(Default)]
pub struct QueryCache {
    inner: RwLock<CacheInner>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get<T: Cacheable>(&self, key: &QueryKey) -> Option<T> {
        let inner = self.inner.read().await;
        inner.entries.get(key).and_then(T::from_cached)
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.inner.read().await.entries.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Takes a ticket before issuing a read.
    pub async fn ticket(&self) -> Ticket {
        Ticket(self.inner.read().await.epoch)
    }

    /// Stores a value unless an invalidation happened since `ticket`.
    pub async fn store<T: Cacheable>(&self, key: QueryKey, value: T, ticket: Ticket) -> bool {
        let mut inner = self.inner.write().await;
        if inner.epoch != ticket.0 {
            debug!(%key, "Discarding read that raced an invalidation");
            return false;
        }
        inner.entries.insert(key, value.into_cached());
        true
    }

    /// Drops every entry any of `invalidations` matches. Returns the count.
    pub async fn apply(&self, invalidations: &[Invalidation]) -> usize {
        let mut inner = self.inner.write().await;
        inner.epoch += 1;

        let before = inner.entries.len();
        inner
            .entries
            .retain(|key, _| !invalidations.iter().any(|i| i.matches(key)));
        let removed = before - inner.entries.len();

        debug!(
            removed,
            rules = ?invalidations.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Invalidated cached reads"
        );
        removed
    }

    /// Drops everything, e.g. after the identity changes.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.epoch += 1;
        inner.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_core::invalidation::{Mutation, QueryGroup};
    use turf_core::DateKey;

    const D1: DateKey = DateKey::from_raw(20240601);
    const D2: DateKey = DateKey::from_raw(20240602);

    #[tokio::test]
    async fn test_store_and_get() {
        let cache = QueryCache::new();
        let t = cache.ticket().await;
        assert!(cache.store(QueryKey::Availability(D1), vec![6u8, 7, 8], t).await);

        let hours: Option<Vec<u8>> = cache.get(&QueryKey::Availability(D1)).await;
        assert_eq!(hours, Some(vec![6, 7, 8]));

        // Wrong type for the key yields nothing
        let flag: Option<bool> = cache.get(&QueryKey::Availability(D1)).await;
        assert!(flag.is_none());
    }

    #[tokio::test]
    async fn test_group_invalidation_hits_all_dates() {
        let cache = QueryCache::new();
        let t = cache.ticket().await;
        cache.store(QueryKey::Availability(D1), vec![6u8], t).await;
        cache.store(QueryKey::Availability(D2), vec![6u8], t).await;
        cache.store(QueryKey::SlotSettings, SlotSettings::default(), t).await;
        cache.store(QueryKey::PricingRules, PricingRules::default(), t).await;

        let removed = cache
            .apply(&Mutation::UpdateSlotSettings.invalidates())
            .await;
        assert_eq!(removed, 3);
        assert!(cache.contains(&QueryKey::PricingRules).await);
    }

    #[tokio::test]
    async fn test_exact_invalidation_keeps_other_dates() {
        let cache = QueryCache::new();
        let t = cache.ticket().await;
        cache.store(QueryKey::Availability(D1), vec![6u8], t).await;
        cache.store(QueryKey::Availability(D2), vec![6u8], t).await;

        cache
            .apply(&[Invalidation::Exact(QueryKey::Availability(D1))])
            .await;
        assert!(!cache.contains(&QueryKey::Availability(D1)).await);
        assert!(cache.contains(&QueryKey::Availability(D2)).await);
    }

    #[tokio::test]
    async fn test_read_racing_invalidation_is_not_stored() {
        let cache = QueryCache::new();
        let stale = cache.ticket().await;

        cache
            .apply(&[Invalidation::Group(QueryGroup::Availability)])
            .await;

        assert!(!cache.store(QueryKey::Availability(D1), vec![19u8], stale).await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = QueryCache::new();
        let t = cache.ticket().await;
        cache.store(QueryKey::IsCallerAdmin, true, t).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
        assert!(!cache.store(QueryKey::IsCallerAdmin, true, t).await);
    }
}
