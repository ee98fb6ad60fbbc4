//! # In-Memory Booking Store
//!
//! A process-local implementation of [`BookingBackend`] that enforces the
//! same invariants as the real store:
//!
//! - one booking or block per slot
//! - claims are exclusive; only one of several racing claims wins
//! - at most [`MAX_OWNERS`](turf_core::MAX_OWNERS) owners, never zero once claimed
//! - emergency reset requires the configured secret
//!
//! Used by the test suites and the `turf-simulate` binary.
//!
//! ## Example
//! ```rust
//! use turf_client::memory::MemoryStore;
//! use turf_core::SlotSettings;
//!
//! let store = MemoryStore::builder()
//!     .settings(SlotSettings::new(6, 22, 60))
//!     .reset_secret("open-sesame")
//!     .build();
//! assert_eq!(store.reset_secret(), "open-sesame");
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use turf_core::availability::{
    check_slot_free, compute_available_hours, compute_earnings, compute_price,
};
use turf_core::ownership::OwnerSet;
use turf_core::validation::{validate_pricing_rules, validate_slot_settings};
use turf_core::{
    BlockedSlot, Booking, CoreError, DateKey, EarningsReport, OwnershipRejection,
    PricingRules, Principal, SlotSettings, Sport, TimeSlot, UserProfile, UserRole,
};

use crate::remote::{traps, BookingBackend, Connector, RemoteError, RemoteResult};

// =============================================================================
// Store State
// =============================================================================

#[derive(Debug, Default)]
struct StoreState {
    settings: SlotSettings,
    pricing: PricingRules,
    bookings: Vec<Booking>,
    blocked: Vec<BlockedSlot>,
    owners: OwnerSet,
    profiles: HashMap<Principal, UserProfile>,
}

struct Shared {
    state: Mutex<StoreState>,
    reset_secret: String,
    latency_ms: AtomicU64,
    available: AtomicBool,
    calls: AtomicU64,
}

/// Handle to a shared in-memory store. Clones see the same data.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Store with default settings, default pricing and no owners.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    pub fn reset_secret(&self) -> &str {
        &self.shared.reset_secret
    }

    /// Makes every call fail as if the store could not be reached.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Delay added before every call is served.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.shared.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of calls served or refused so far.
    pub fn call_count(&self) -> u64 {
        self.shared.calls.load(Ordering::SeqCst)
    }

    pub async fn owners(&self) -> Vec<Principal> {
        self.shared.state.lock().await.owners.owners().to_vec()
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.shared.state.lock().await.bookings.clone()
    }

    pub async fn booking_count(&self) -> usize {
        self.shared.state.lock().await.bookings.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MemoryStore {
    fn connect(&self, caller: Option<&Principal>) -> Arc<dyn BookingBackend> {
        debug!(caller = ?caller.map(Principal::as_str), "Connecting to in-memory store");
        Arc::new(MemoryAgent {
            shared: Arc::clone(&self.shared),
            caller: caller.cloned(),
        })
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for a [`MemoryStore`] with seeded data.
#[derive(Default)]
pub struct MemoryStoreBuilder {
    state: StoreState,
    reset_secret: Option<String>,
}

impl MemoryStoreBuilder {
    pub fn settings(mut self, settings: SlotSettings) -> Self {
        self.state.settings = settings;
        self
    }

    pub fn pricing(mut self, pricing: PricingRules) -> Self {
        self.state.pricing = pricing;
        self
    }

    /// Seeds the owner set. Duplicates are dropped.
    pub fn owners<I, P>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.state.owners = OwnerSet::from_owners(owners.into_iter().map(|p| Principal::new(p)));
        self
    }

    pub fn profile(mut self, principal: &str, profile: UserProfile) -> Self {
        self.state.profiles.insert(Principal::new(principal), profile);
        self
    }

    pub fn reset_secret(mut self, secret: impl Into<String>) -> Self {
        self.reset_secret = Some(secret.into());
        self
    }

    pub fn build(self) -> MemoryStore {
        MemoryStore {
            shared: Arc::new(Shared {
                state: Mutex::new(self.state),
                reset_secret: self.reset_secret.unwrap_or_default(),
                latency_ms: AtomicU64::new(0),
                available: AtomicBool::new(true),
                calls: AtomicU64::new(0),
            }),
        }
    }
}

// =============================================================================
// Agent
// =============================================================================

/// One caller's connection to a [`MemoryStore`].
struct MemoryAgent {
    shared: Arc<Shared>,
    caller: Option<Principal>,
}

fn rejected(text: &str) -> RemoteError {
    RemoteError::Rejected(text.to_string())
}

fn slot_rejection(err: CoreError) -> RemoteError {
    match err {
        CoreError::SlotTaken { .. } => rejected(traps::SLOT_BOOKED),
        CoreError::SlotBlocked { .. } => rejected(traps::SLOT_BLOCKED),
        CoreError::OutsideOpeningHours { .. } => rejected(traps::OUTSIDE_HOURS),
        _ => rejected(traps::INVALID_INPUT),
    }
}

fn ownership_rejection(rejection: OwnershipRejection) -> RemoteError {
    let text = match rejection {
        OwnershipRejection::Duplicate => traps::DUPLICATE_OWNER,
        OwnershipRejection::Capacity { .. } => traps::OWNER_CAPACITY,
        OwnershipRejection::LastOwner => traps::LAST_OWNER,
        OwnershipRejection::NotAnOwner => traps::NOT_AN_OWNER,
        OwnershipRejection::AlreadyClaimed => traps::ALREADY_CLAIMED,
        OwnershipRejection::Unauthorized => traps::ONLY_ADMINS,
        OwnershipRejection::InvalidResetCode => traps::INVALID_RESET_CODE,
    };
    rejected(text)
}

impl MemoryAgent {
    /// Waits out the configured latency, then locks the state.
    async fn enter(&self) -> RemoteResult<MutexGuard<'_, StoreState>> {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.shared.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !self.shared.available.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("connection refused".to_string()));
        }
        Ok(self.shared.state.lock().await)
    }

    fn require_user(&self) -> RemoteResult<&Principal> {
        self.caller.as_ref().ok_or_else(|| rejected(traps::ONLY_USERS))
    }

    fn require_admin(&self, state: &StoreState) -> RemoteResult<()> {
        match &self.caller {
            Some(caller) if state.owners.contains(caller) => Ok(()),
            _ => Err(rejected(traps::ONLY_ADMINS)),
        }
    }
}

#[async_trait]
impl BookingBackend for MemoryAgent {
    async fn book(
        &self,
        slot: TimeSlot,
        customer_name: String,
        phone_number: String,
        sport: Sport,
    ) -> RemoteResult<String> {
        let mut state = self.enter().await?;
        let caller = self.require_user()?.clone();

        check_slot_free(&slot, Some(&state.settings), &state.bookings, &state.blocked)
            .map_err(slot_rejection)?;

        let price = compute_price(slot.start_hour, Some(&state.pricing), slot.date.is_weekend())
            .known()
            .ok_or_else(|| rejected(traps::INVALID_INPUT))?;

        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            time_slot: slot,
            customer_name,
            phone_number,
            sport,
            price,
            booked_by: caller,
            created_at: Utc::now(),
        };
        let id = booking.id.clone();
        info!(id = %id, date = %slot.date, hour = slot.start_hour, %price, "Booking stored");
        state.bookings.push(booking);
        Ok(id)
    }

    async fn check_availability(&self, date: DateKey) -> RemoteResult<Vec<u8>> {
        let state = self.enter().await?;
        Ok(compute_available_hours(
            date,
            Some(&state.settings),
            &state.bookings,
            &state.blocked,
        ))
    }

    async fn get_booking(&self, id: &str) -> RemoteResult<Booking> {
        let state = self.enter().await?;
        state
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| rejected(traps::BOOKING_NOT_FOUND))
    }

    async fn get_all_bookings(&self) -> RemoteResult<Vec<Booking>> {
        let state = self.enter().await?;
        Ok(state.bookings.clone())
    }

    async fn get_my_bookings(&self) -> RemoteResult<Vec<Booking>> {
        let state = self.enter().await?;
        let caller = self.require_user()?;
        Ok(state
            .bookings
            .iter()
            .filter(|b| &b.booked_by == caller)
            .cloned()
            .collect())
    }

    async fn block_slot(&self, slot: BlockedSlot) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        self.require_admin(&state)?;

        let time_slot = TimeSlot::new(
            slot.date,
            slot.start_hour,
            state.settings.slot_duration_minutes,
        );
        check_slot_free(&time_slot, Some(&state.settings), &state.bookings, &state.blocked)
            .map_err(slot_rejection)?;

        info!(date = %slot.date, hour = slot.start_hour, reason = %slot.reason, "Slot blocked");
        state.blocked.push(slot);
        Ok(())
    }

    async fn unblock_slot(&self, date: DateKey, start_hour: u8) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        self.require_admin(&state)?;

        let index = state
            .blocked
            .iter()
            .position(|b| b.date == date && b.start_hour == start_hour)
            .ok_or_else(|| rejected(traps::BLOCK_NOT_FOUND))?;
        state.blocked.remove(index);
        Ok(())
    }

    async fn get_blocked_slots(&self) -> RemoteResult<Vec<BlockedSlot>> {
        let state = self.enter().await?;
        Ok(state.blocked.clone())
    }

    async fn get_slot_settings(&self) -> RemoteResult<SlotSettings> {
        Ok(self.enter().await?.settings)
    }

    async fn update_slot_settings(&self, settings: SlotSettings) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        self.require_admin(&state)?;
        validate_slot_settings(&settings).map_err(|_| rejected(traps::INVALID_INPUT))?;
        state.settings = settings;
        Ok(())
    }

    async fn get_pricing_rules(&self) -> RemoteResult<PricingRules> {
        Ok(self.enter().await?.pricing)
    }

    async fn update_pricing_rules(&self, rules: PricingRules) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        self.require_admin(&state)?;
        validate_pricing_rules(&rules).map_err(|_| rejected(traps::INVALID_INPUT))?;
        state.pricing = rules;
        Ok(())
    }

    async fn get_daily_earnings(&self, date: DateKey) -> RemoteResult<EarningsReport> {
        let state = self.enter().await?;
        self.require_admin(&state)?;
        Ok(compute_earnings(&state.bookings, date, date))
    }

    async fn get_weekly_earnings(
        &self,
        start: DateKey,
        end: DateKey,
    ) -> RemoteResult<EarningsReport> {
        let state = self.enter().await?;
        self.require_admin(&state)?;
        Ok(compute_earnings(&state.bookings, start, end))
    }

    async fn get_caller_user_role(&self) -> RemoteResult<UserRole> {
        let state = self.enter().await?;
        Ok(state.owners.role_of(self.caller.as_ref()))
    }

    async fn is_caller_admin(&self) -> RemoteResult<bool> {
        let state = self.enter().await?;
        Ok(self
            .caller
            .as_ref()
            .is_some_and(|caller| state.owners.contains(caller)))
    }

    async fn get_caller_user_profile(&self) -> RemoteResult<Option<UserProfile>> {
        let state = self.enter().await?;
        let caller = self.require_user()?;
        Ok(state.profiles.get(caller).cloned())
    }

    async fn save_caller_user_profile(&self, profile: UserProfile) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        let caller = self.require_user()?.clone();
        state.profiles.insert(caller, profile);
        Ok(())
    }

    async fn get_owners(&self) -> RemoteResult<Vec<Principal>> {
        let state = self.enter().await?;
        self.require_admin(&state)?;
        Ok(state.owners.owners().to_vec())
    }

    async fn add_owner(&self, principal: Principal) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        self.require_admin(&state)?;
        state
            .owners
            .add(principal.clone())
            .map_err(ownership_rejection)?;
        info!(%principal, "Owner added");
        Ok(())
    }

    async fn remove_owner(&self, principal: Principal) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        self.require_admin(&state)?;
        state
            .owners
            .remove(&principal)
            .map_err(ownership_rejection)?;
        info!(%principal, "Owner removed");
        Ok(())
    }

    async fn is_ownership_claimable(&self) -> RemoteResult<bool> {
        Ok(self.enter().await?.owners.is_claimable())
    }

    async fn claim_new_ownership(&self) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        let caller = self.require_user()?.clone();
        state
            .owners
            .claim(caller.clone())
            .map_err(ownership_rejection)?;
        info!(%caller, "Ownership claimed");
        Ok(())
    }

    async fn emergency_reset_ownership(&self, code: String) -> RemoteResult<()> {
        let mut state = self.enter().await?;
        self.require_user()?;
        state
            .owners
            .reset(&code, &self.shared.reset_secret)
            .map_err(ownership_rejection)?;
        info!("Owner set cleared by emergency reset");
        Ok(())
    }
}
