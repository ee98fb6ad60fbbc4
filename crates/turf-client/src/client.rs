//! # Turf Client
//!
//! The one place the presentation layer talks to the booking store.
//!
//! ## Call Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Read Path                                       │
//! │                                                                         │
//! │   read(key) ──► identity changed? ──yes──► reconnect + clear cache      │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │                cache hit? ──yes──► value                                │
//! │                     │ no                                                │
//! │                     ▼                                                   │
//! │         ticket ──► store call (timeout) ──► store unless stale          │
//! │                                                                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                         Mutation Path                                   │
//! │                                                                         │
//! │   validate input ──► spawn store call ──► scope closed first?           │
//! │                                              │yes        │no            │
//! │                                              ▼           ▼              │
//! │                                          Cancelled    ok │ conflict     │
//! │                                      (call continues)    │   │          │
//! │                                                          ▼   ▼          │
//! │                                             invalidate   refresh        │
//! │                                             stale reads  conflict reads │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                              result returned; caller    │
//! │                                              navigates afterwards       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invalidation runs before the mutation's result is returned, so any
//! navigation the caller does next reads fresh data. Mutations are never
//! retried automatically.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

use turf_core::availability::{self, PricedSlot, SlotInfo};
use turf_core::invalidation::{Mutation, QueryKey};
use turf_core::ownership::AccessState;
use turf_core::validation::{
    prepare_booking, validate_block_reason, validate_booking_date, validate_hour,
    validate_principal, validate_pricing_rules, validate_profile, validate_reset_code,
    validate_slot_settings,
};
use turf_core::{
    BlockedSlot, Booking, CoreError, DateKey, EarningsReport, PricingRules, Principal,
    SlotSettings, UserProfile, UserRole, ValidationError,
};

use crate::cache::{Cacheable, QueryCache};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, Operation};
use crate::identity::IdentitySession;
use crate::remote::{BookingBackend, Connector, RemoteResult};
use crate::scope::ViewScope;

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives client events (implemented by the UI integration).
pub trait ClientEventEmitter: Send + Sync {
    /// The access gate moved to a new state.
    fn emit_access(&self, state: AccessState);

    /// A mutation was acknowledged and its stale reads dropped.
    fn emit_invalidated(&self, mutation: Mutation, removed: usize);

    /// A call failed; `retryable` mirrors [`ClientError::is_retryable`].
    fn emit_error(&self, operation: Operation, message: &str, retryable: bool);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl ClientEventEmitter for NoOpEmitter {
    fn emit_access(&self, _state: AccessState) {}
    fn emit_invalidated(&self, _mutation: Mutation, _removed: usize) {}
    fn emit_error(&self, _operation: Operation, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Turf Client
// =============================================================================

/// The backend currently bound to an identity.
struct Session {
    principal: Option<Principal>,
    backend: Arc<dyn BookingBackend>,
}

pub struct TurfClient {
    config: Arc<ClientConfig>,

    identity: Arc<dyn IdentitySession>,

    connector: Arc<dyn Connector>,

    session: RwLock<Session>,

    cache: QueryCache,

    emitter: Arc<dyn ClientEventEmitter>,
}

impl TurfClient {
    pub fn new(
        config: ClientConfig,
        identity: Arc<dyn IdentitySession>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self::with_emitter(config, identity, connector, Arc::new(NoOpEmitter))
    }

    pub fn with_emitter(
        config: ClientConfig,
        identity: Arc<dyn IdentitySession>,
        connector: Arc<dyn Connector>,
        emitter: Arc<dyn ClientEventEmitter>,
    ) -> Self {
        let principal = identity.principal();
        let backend = connector.connect(principal.as_ref());

        TurfClient {
            config: Arc::new(config),
            identity,
            connector,
            session: RwLock::new(Session { principal, backend }),
            cache: QueryCache::new(),
            emitter,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identity(&self) -> &Arc<dyn IdentitySession> {
        &self.identity
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub(crate) fn emitter(&self) -> &Arc<dyn ClientEventEmitter> {
        &self.emitter
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Rebinds the backend when the identity session changed since the
    /// last call. Every cached read belonged to the old identity.
    pub async fn sync_identity(&self) -> (Option<Principal>, Arc<dyn BookingBackend>) {
        let current = self.identity.principal();
        {
            let session = self.session.read().await;
            if session.principal == current {
                return (current, Arc::clone(&session.backend));
            }
        }

        let mut session = self.session.write().await;
        if session.principal != current {
            info!(
                from = ?session.principal.as_ref().map(Principal::as_str),
                to = ?current.as_ref().map(Principal::as_str),
                "Identity changed, reconnecting"
            );
            session.backend = self.connector.connect(current.as_ref());
            session.principal = current.clone();
            self.cache.clear().await;
        }
        (current, Arc::clone(&session.backend))
    }

    /// Runs a store call under the configured timeout.
    async fn call<T, F>(&self, operation: Operation, fut: F) -> ClientResult<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        let result = match tokio::time::timeout(self.config.request_timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ClientError::from_remote(operation, err)),
            Err(_) => {
                warn!(%operation, timeout_secs = self.config.backend.request_timeout_secs, "Booking store call timed out");
                Err(ClientError::Failed { operation })
            }
        };
        if let Err(ref err) = result {
            self.emitter
                .emit_error(operation, &err.to_string(), err.is_retryable());
        }
        result
    }

    /// Serves `key` from cache, or fetches it and caches the answer.
    async fn read_through<T, F, Fut>(
        &self,
        key: QueryKey,
        operation: Operation,
        fetch: F,
    ) -> ClientResult<T>
    where
        T: Cacheable,
        F: FnOnce(Arc<dyn BookingBackend>) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let (_, backend) = self.sync_identity().await;

        if let Some(hit) = self.cache.get::<T>(&key).await {
            trace!(%key, "Cache hit");
            return Ok(hit);
        }

        let ticket = self.cache.ticket().await;
        let value = self.call(operation, fetch(backend)).await?;
        self.cache.store(key, value.clone(), ticket).await;
        Ok(value)
    }

    /// Runs a mutation tied to `scope`.
    ///
    /// The store call runs on its own task. If the scope closes first the
    /// task is left to finish in the store, but none of the mutation's
    /// cache effects are applied and the caller gets `Cancelled`.
    async fn mutate<T, Fut>(
        &self,
        scope: &ViewScope,
        mutation: Mutation,
        operation: Operation,
        fut: Fut,
    ) -> ClientResult<T>
    where
        T: Send + 'static,
        Fut: Future<Output = RemoteResult<T>> + Send + 'static,
    {
        if scope.is_closed() {
            return Err(ClientError::Cancelled { operation });
        }

        let timeout = self.config.request_timeout();
        let handle = tokio::spawn(async move { tokio::time::timeout(timeout, fut).await });

        let joined = tokio::select! {
            joined = handle => joined,
            _ = scope.closed() => {
                info!(%operation, "View closed before the store answered; skipping effects");
                return Err(ClientError::Cancelled { operation });
            }
        };

        let outcome = match joined {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(ClientError::from_remote(operation, err)),
            Ok(Err(_)) => {
                warn!(%operation, "Booking store call timed out");
                Err(ClientError::Failed { operation })
            }
            Err(join_err) => {
                warn!(%operation, error = %join_err, "Store call task did not complete");
                Err(ClientError::Failed { operation })
            }
        };

        if scope.is_closed() {
            info!(%operation, "View closed while the answer was handled; skipping effects");
            return Err(ClientError::Cancelled { operation });
        }

        match outcome {
            Ok(value) => {
                let removed = self.cache.apply(&mutation.invalidates()).await;
                debug!(mutation = mutation.name(), removed, "Mutation acknowledged");
                self.emitter.emit_invalidated(mutation, removed);
                Ok(value)
            }
            Err(err) => {
                if err.is_conflict() {
                    let refresh = mutation.refresh_on_conflict();
                    if !refresh.is_empty() {
                        self.cache.apply(&refresh).await;
                    }
                }
                self.emitter
                    .emit_error(operation, &err.to_string(), err.is_retryable());
                Err(err)
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn slot_settings(&self) -> ClientResult<SlotSettings> {
        self.read_through(QueryKey::SlotSettings, Operation::GetSlotSettings, |b| async move {
            b.get_slot_settings().await
        })
        .await
    }

    pub async fn pricing_rules(&self) -> ClientResult<PricingRules> {
        self.read_through(QueryKey::PricingRules, Operation::GetPricingRules, |b| async move {
            b.get_pricing_rules().await
        })
        .await
    }

    /// Bookable hours of `date`, ascending.
    pub async fn check_availability(&self, date: DateKey) -> ClientResult<Vec<u8>> {
        ensure_valid_date(date)?;
        self.read_through(
            QueryKey::Availability(date),
            Operation::CheckAvailability,
            |b| async move { b.check_availability(date).await },
        )
        .await
    }

    pub async fn blocked_slots(&self) -> ClientResult<Vec<BlockedSlot>> {
        self.read_through(QueryKey::BlockedSlots, Operation::GetBlockedSlots, |b| async move {
            b.get_blocked_slots().await
        })
        .await
    }

    pub async fn all_bookings(&self) -> ClientResult<Vec<Booking>> {
        self.read_through(QueryKey::AllBookings, Operation::GetAllBookings, |b| async move {
            b.get_all_bookings().await
        })
        .await
    }

    pub async fn my_bookings(&self) -> ClientResult<Vec<Booking>> {
        self.read_through(QueryKey::MyBookings, Operation::GetMyBookings, |b| async move {
            b.get_my_bookings().await
        })
        .await
    }

    /// Looks up a booking by the id `book` returned.
    pub async fn booking(&self, id: &str) -> ClientResult<Booking> {
        let id = id.trim().to_string();
        if id.is_empty() {
            return Err(ValidationError::Required {
                field: "booking id".to_string(),
            }
            .into());
        }
        self.read_through(
            QueryKey::Booking(id.clone()),
            Operation::GetBooking,
            |b| async move { b.get_booking(&id).await },
        )
        .await
    }

    pub async fn daily_earnings(&self, date: DateKey) -> ClientResult<EarningsReport> {
        ensure_valid_date(date)?;
        self.read_through(
            QueryKey::DailyEarnings(date),
            Operation::GetDailyEarnings,
            |b| async move { b.get_daily_earnings(date).await },
        )
        .await
    }

    pub async fn weekly_earnings(
        &self,
        start: DateKey,
        end: DateKey,
    ) -> ClientResult<EarningsReport> {
        ensure_valid_date(start)?;
        ensure_valid_date(end)?;
        if start > end {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: format!("{start} is after {end}"),
            }
            .into());
        }
        self.read_through(
            QueryKey::WeeklyEarnings(start, end),
            Operation::GetWeeklyEarnings,
            |b| async move { b.get_weekly_earnings(start, end).await },
        )
        .await
    }

    /// Earnings for the Monday-to-Sunday week containing `date`.
    pub async fn week_earnings(&self, date: DateKey) -> ClientResult<EarningsReport> {
        let (monday, sunday) = date.week_bounds()?;
        self.weekly_earnings(monday, sunday).await
    }

    pub async fn caller_role(&self) -> ClientResult<UserRole> {
        self.read_through(QueryKey::CallerRole, Operation::GetCallerUserRole, |b| async move {
            b.get_caller_user_role().await
        })
        .await
    }

    pub async fn is_caller_admin(&self) -> ClientResult<bool> {
        self.read_through(QueryKey::IsCallerAdmin, Operation::IsCallerAdmin, |b| async move {
            b.is_caller_admin().await
        })
        .await
    }

    pub async fn caller_profile(&self) -> ClientResult<Option<UserProfile>> {
        self.read_through(
            QueryKey::CallerProfile,
            Operation::GetCallerUserProfile,
            |b| async move { b.get_caller_user_profile().await },
        )
        .await
    }

    pub async fn owners(&self) -> ClientResult<Vec<Principal>> {
        self.read_through(QueryKey::Owners, Operation::GetOwners, |b| async move {
            b.get_owners().await
        })
        .await
    }

    pub async fn is_ownership_claimable(&self) -> ClientResult<bool> {
        self.read_through(
            QueryKey::OwnershipClaimable,
            Operation::IsOwnershipClaimable,
            |b| async move { b.is_ownership_claimable().await },
        )
        .await
    }

    // =========================================================================
    // Derived Views
    // =========================================================================

    /// Bookable hours of `date` with their prices. Prices are `Unknown`
    /// when the rules cannot be fetched.
    pub async fn priced_slots(&self, date: DateKey) -> ClientResult<Vec<PricedSlot>> {
        let hours = self.check_availability(date).await?;
        let rules = match self.pricing_rules().await {
            Ok(rules) => Some(rules),
            Err(err) => {
                warn!(%date, error = %err, "Pricing rules unavailable, showing unknown prices");
                None
            }
        };
        Ok(availability::quote_day(date, &hours, rules.as_ref()))
    }

    /// Status of every hour of `date` for the admin calendar.
    pub async fn slot_board(&self, date: DateKey) -> ClientResult<Vec<SlotInfo>> {
        ensure_valid_date(date)?;
        let (settings, bookings, blocked) = tokio::try_join!(
            self.slot_settings(),
            self.all_bookings(),
            self.blocked_slots()
        )?;
        Ok(availability::slot_board(date, &settings, &bookings, &blocked))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Books `start_hour` on `date` and returns the booking id.
    ///
    /// The slot duration comes from the slot settings (read through the
    /// cache once the form is valid). If they cannot be read, the
    /// configured default is used.
    pub async fn book(
        &self,
        scope: &ViewScope,
        date: DateKey,
        start_hour: u8,
        customer_name: &str,
        phone_number: &str,
        sport: &str,
    ) -> ClientResult<String> {
        validate_booking_date(date, today(), self.config.booking.allow_past_dates)?;

        let fallback = self.config.booking.default_slot_duration_minutes;
        let slot = turf_core::TimeSlot::new(date, start_hour, fallback);
        let mut request = prepare_booking(slot, customer_name, phone_number, sport)?;

        request.time_slot.duration_minutes = match self.slot_settings().await {
            Ok(settings) => settings.slot_duration_minutes,
            Err(err) => {
                warn!(error = %err, fallback, "Slot settings unavailable, using default duration");
                fallback
            }
        };

        let (_, backend) = self.sync_identity().await;
        info!(%date, hour = start_hour, slot = %turf_core::format_hour(start_hour), sport = %request.sport, "Booking slot");

        self.mutate(
            scope,
            Mutation::Book { date },
            Operation::Book,
            async move {
                backend
                    .book(
                        request.time_slot,
                        request.customer_name,
                        request.phone_number,
                        request.sport,
                    )
                    .await
            },
        )
        .await
    }

    pub async fn block_slot(
        &self,
        scope: &ViewScope,
        date: DateKey,
        start_hour: u8,
        reason: &str,
    ) -> ClientResult<()> {
        ensure_valid_date(date)?;
        validate_hour(start_hour)?;
        let reason = validate_block_reason(reason)?;

        let (_, backend) = self.sync_identity().await;
        let slot = BlockedSlot::new(date, start_hour, reason);
        self.mutate(
            scope,
            Mutation::BlockSlot { date },
            Operation::BlockSlot,
            async move { backend.block_slot(slot).await },
        )
        .await
    }

    pub async fn unblock_slot(
        &self,
        scope: &ViewScope,
        date: DateKey,
        start_hour: u8,
    ) -> ClientResult<()> {
        ensure_valid_date(date)?;
        validate_hour(start_hour)?;

        let (_, backend) = self.sync_identity().await;
        self.mutate(
            scope,
            Mutation::UnblockSlot { date },
            Operation::UnblockSlot,
            async move { backend.unblock_slot(date, start_hour).await },
        )
        .await
    }

    pub async fn update_slot_settings(
        &self,
        scope: &ViewScope,
        settings: SlotSettings,
    ) -> ClientResult<()> {
        validate_slot_settings(&settings)?;

        let (_, backend) = self.sync_identity().await;
        self.mutate(
            scope,
            Mutation::UpdateSlotSettings,
            Operation::UpdateSlotSettings,
            async move { backend.update_slot_settings(settings).await },
        )
        .await
    }

    pub async fn update_pricing_rules(
        &self,
        scope: &ViewScope,
        rules: PricingRules,
    ) -> ClientResult<()> {
        validate_pricing_rules(&rules)?;

        let (_, backend) = self.sync_identity().await;
        self.mutate(
            scope,
            Mutation::UpdatePricingRules,
            Operation::UpdatePricingRules,
            async move { backend.update_pricing_rules(rules).await },
        )
        .await
    }

    pub async fn save_profile(&self, scope: &ViewScope, profile: &UserProfile) -> ClientResult<()> {
        let profile = validate_profile(profile)?;

        let (_, backend) = self.sync_identity().await;
        self.mutate(
            scope,
            Mutation::SaveCallerProfile,
            Operation::SaveCallerUserProfile,
            async move { backend.save_caller_user_profile(profile).await },
        )
        .await
    }

    pub async fn claim_new_ownership(&self, scope: &ViewScope) -> ClientResult<()> {
        let (_, backend) = self.sync_identity().await;
        self.mutate(
            scope,
            Mutation::ClaimOwnership,
            Operation::ClaimNewOwnership,
            async move { backend.claim_new_ownership().await },
        )
        .await
    }

    pub async fn emergency_reset_ownership(
        &self,
        scope: &ViewScope,
        code: &str,
    ) -> ClientResult<()> {
        let code = validate_reset_code(code)?;

        let (_, backend) = self.sync_identity().await;
        self.mutate(
            scope,
            Mutation::EmergencyReset,
            Operation::EmergencyResetOwnership,
            async move { backend.emergency_reset_ownership(code).await },
        )
        .await
    }

    pub async fn add_owner(&self, scope: &ViewScope, principal: &str) -> ClientResult<()> {
        let principal = validate_principal(principal)?;

        let (_, backend) = self.sync_identity().await;
        self.mutate(
            scope,
            Mutation::AddOwner,
            Operation::AddOwner,
            async move { backend.add_owner(principal).await },
        )
        .await
    }

    pub async fn remove_owner(&self, scope: &ViewScope, principal: &str) -> ClientResult<()> {
        let principal = validate_principal(principal)?;

        let (_, backend) = self.sync_identity().await;
        self.mutate(
            scope,
            Mutation::RemoveOwner,
            Operation::RemoveOwner,
            async move { backend.remove_owner(principal).await },
        )
        .await
    }
}

fn ensure_valid_date(date: DateKey) -> ClientResult<()> {
    if date.is_valid() {
        Ok(())
    } else {
        Err(CoreError::InvalidDate(date.raw()).into())
    }
}

fn today() -> DateKey {
    DateKey::from_date(chrono::Local::now().date_naive())
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a [`TurfClient`] with options.
pub struct TurfClientBuilder {
    config: ClientConfig,
    identity: Option<Arc<dyn IdentitySession>>,
    connector: Option<Arc<dyn Connector>>,
    emitter: Option<Arc<dyn ClientEventEmitter>>,
}

impl TurfClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        TurfClientBuilder {
            config,
            identity: None,
            connector: None,
            emitter: None,
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentitySession>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn ClientEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Builds the client. A missing identity session means an anonymous
    /// visitor who can never log in.
    pub fn build(self) -> ClientResult<TurfClient> {
        let connector = self.connector.ok_or_else(|| {
            ClientError::from(ValidationError::Required {
                field: "connector".to_string(),
            })
        })?;
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(crate::identity::LocalIdentity::new()));
        let emitter = self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter));

        Ok(TurfClient::with_emitter(self.config, identity, connector, emitter))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use super::*;
    use crate::error::{ConflictReason, DenialReason};
    use crate::identity::LocalIdentity;
    use crate::memory::MemoryStore;
    use turf_core::availability::{PriceQuote, SlotStatus};
    use turf_core::Money;

    const MONDAY: DateKey = DateKey::from_raw(20240603);
    const TUESDAY: DateKey = DateKey::from_raw(20240604);

    fn test_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.booking.allow_past_dates = true;
        config
    }

    fn client_for(store: &MemoryStore, who: Option<&str>) -> (Arc<LocalIdentity>, TurfClient) {
        let identity = Arc::new(match who {
            Some(name) => LocalIdentity::signed_in(Principal::new(name)),
            None => LocalIdentity::new(),
        });
        let client = TurfClient::new(
            test_config(),
            identity.clone(),
            Arc::new(store.clone()),
        );
        (identity, client)
    }

    async fn book_at(client: &TurfClient, date: DateKey, hour: u8) -> ClientResult<String> {
        client
            .book(&ViewScope::new(), date, hour, "Asha", "98765 43210", "Football")
            .await
    }

    #[derive(Default)]
    struct RecordingEmitter {
        invalidated: StdMutex<Vec<Mutation>>,
        errors: StdMutex<Vec<Operation>>,
    }

    impl ClientEventEmitter for RecordingEmitter {
        fn emit_access(&self, _state: AccessState) {}

        fn emit_invalidated(&self, mutation: Mutation, _removed: usize) {
            self.invalidated.lock().unwrap().push(mutation);
        }

        fn emit_error(&self, operation: Operation, _message: &str, _retryable: bool) {
            self.errors.lock().unwrap().push(operation);
        }
    }

    #[tokio::test]
    async fn test_reads_are_cached() {
        let store = MemoryStore::new();
        let (_, client) = client_for(&store, None);

        let first = client.check_availability(MONDAY).await.unwrap();
        let calls = store.call_count();
        let second = client.check_availability(MONDAY).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.call_count(), calls);
    }

    #[tokio::test]
    async fn test_booking_invalidates_availability_of_that_date() {
        let store = MemoryStore::new();
        let (_, client) = client_for(&store, Some("asha"));

        assert!(client.check_availability(MONDAY).await.unwrap().contains(&19));
        assert!(client.check_availability(TUESDAY).await.unwrap().contains(&19));

        let id = book_at(&client, MONDAY, 19).await.unwrap();
        assert!(!client.cache().contains(&QueryKey::Availability(MONDAY)).await);
        assert!(client.cache().contains(&QueryKey::Availability(TUESDAY)).await);

        assert!(!client.check_availability(MONDAY).await.unwrap().contains(&19));

        let booking = client.booking(&id).await.unwrap();
        assert_eq!(booking.time_slot.start_hour, 19);
        assert_eq!(booking.price, Money::from_units(400));
        assert_eq!(client.my_bookings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_losing_a_booking_race_refreshes_availability() {
        let store = MemoryStore::new();
        let (_, first) = client_for(&store, Some("asha"));
        let (_, second) = client_for(&store, Some("ravi"));

        assert!(second.check_availability(MONDAY).await.unwrap().contains(&19));
        book_at(&first, MONDAY, 19).await.unwrap();

        // Second client still shows 19 from its cache, then loses the race
        let err = book_at(&second, MONDAY, 19).await.unwrap_err();
        assert_eq!(err, ClientError::Conflict(ConflictReason::SlotTaken));
        assert!(!second.check_availability(MONDAY).await.unwrap().contains(&19));
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_booking_uses_store_slot_duration_on_cold_cache() {
        let store = MemoryStore::builder()
            .settings(SlotSettings::new(6, 23, 90))
            .build();
        let (_, client) = client_for(&store, Some("asha"));
        assert!(!client.cache().contains(&QueryKey::SlotSettings).await);

        let id = book_at(&client, MONDAY, 19).await.unwrap();
        let booking = client.booking(&id).await.unwrap();
        assert_eq!(booking.time_slot.duration_minutes, 90);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_store() {
        let store = MemoryStore::new();
        let (_, client) = client_for(&store, Some("asha"));

        let err = client
            .book(&ViewScope::new(), MONDAY, 19, "Asha", "call me", "Football")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let err = client
            .book(&ViewScope::new(), MONDAY, 19, "Asha", "9876543210", "Tennis")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let err = client
            .update_slot_settings(&ViewScope::new(), SlotSettings::new(22, 6, 60))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_past_dates_rejected_unless_allowed() {
        let store = MemoryStore::new();
        let identity = Arc::new(LocalIdentity::signed_in(Principal::new("asha")));
        let client = TurfClient::new(ClientConfig::default(), identity, Arc::new(store.clone()));

        let err = book_at(&client, DateKey::from_raw(20000101), 10).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_scope_skips_call() {
        let store = MemoryStore::new();
        let (_, client) = client_for(&store, Some("asha"));
        let scope = ViewScope::new();
        scope.close();

        let err = client
            .book(&scope, MONDAY, 19, "Asha", "9876543210", "Football")
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Cancelled { operation: Operation::Book });
        assert_eq!(store.booking_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_closed_mid_flight_skips_invalidation() {
        let store = MemoryStore::new();
        let (_, client) = client_for(&store, Some("asha"));
        assert!(client.check_availability(MONDAY).await.unwrap().contains(&19));
        client.slot_settings().await.unwrap();

        store.set_latency(Duration::from_millis(100));
        let scope = ViewScope::new();
        let closer = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            closer.close();
        });

        let err = client
            .book(&scope, MONDAY, 19, "Asha", "9876543210", "Football")
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Cancelled { operation: Operation::Book });

        // The store still completes the booking
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.booking_count().await, 1);

        // but the cached read was left alone
        let cached: Option<Vec<u8>> = client.cache().get(&QueryKey::Availability(MONDAY)).await;
        assert!(cached.unwrap().contains(&19));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_generic_failure() {
        let store = MemoryStore::new();
        let (_, client) = client_for(&store, None);
        store.set_latency(Duration::from_secs(120));

        let err = client.slot_settings().await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Failed {
                operation: Operation::GetSlotSettings
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_retryable() {
        let store = MemoryStore::new();
        let emitter = Arc::new(RecordingEmitter::default());
        let client = TurfClientBuilder::new(test_config())
            .with_identity(Arc::new(LocalIdentity::signed_in(Principal::new("asha"))))
            .with_connector(Arc::new(store.clone()))
            .with_emitter(emitter.clone())
            .build()
            .unwrap();

        store.set_available(false);
        let err = book_at(&client, MONDAY, 8).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(emitter.errors.lock().unwrap().last(), Some(&Operation::Book));

        store.set_available(true);
        book_at(&client, MONDAY, 8).await.unwrap();
        assert_eq!(
            *emitter.invalidated.lock().unwrap(),
            vec![Mutation::Book { date: MONDAY }]
        );
    }

    #[tokio::test]
    async fn test_identity_switch_clears_cache() {
        let store = MemoryStore::builder().owners(["asha"]).build();
        let (identity, client) = client_for(&store, Some("asha"));

        assert!(client.is_caller_admin().await.unwrap());
        identity.switch_to(Some(Principal::new("ravi")));
        assert!(!client.is_caller_admin().await.unwrap());

        identity.switch_to(None);
        assert_eq!(client.caller_role().await.unwrap(), UserRole::Guest);
    }

    #[tokio::test]
    async fn test_priced_slots() {
        let store = MemoryStore::new();
        let (_, client) = client_for(&store, None);

        let slots = client.priced_slots(MONDAY).await.unwrap();
        assert_eq!(slots.len(), 16);
        let price_at = |hour: u8| slots.iter().find(|s| s.hour == hour).map(|s| s.price);
        assert_eq!(price_at(6), Some(PriceQuote::Known(Money::from_units(300))));
        assert_eq!(price_at(18), Some(PriceQuote::Known(Money::from_units(400))));
    }

    #[tokio::test]
    async fn test_admin_views() {
        let store = MemoryStore::builder().owners(["owner"]).build();
        let (_, admin) = client_for(&store, Some("owner"));
        let (_, player) = client_for(&store, Some("asha"));

        book_at(&player, MONDAY, 19).await.unwrap();
        admin
            .block_slot(&ViewScope::new(), MONDAY, 7, "Maintenance")
            .await
            .unwrap();

        let board = admin.slot_board(MONDAY).await.unwrap();
        assert_eq!(board.len(), 16);
        assert!(matches!(board[1].status, SlotStatus::Blocked { ref reason } if reason == "Maintenance"));
        assert!(matches!(board[13].status, SlotStatus::Booked { .. }));
        assert_eq!(board[0].status, SlotStatus::Free);

        let week = admin.week_earnings(DateKey::from_raw(20240606)).await.unwrap();
        assert_eq!(week.start_date, MONDAY);
        assert_eq!(week.booking_count, 1);
        assert_eq!(week.total_revenue, Money::from_units(400));

        let err = player.daily_earnings(MONDAY).await.unwrap_err();
        assert_eq!(err, ClientError::Unauthorized(DenialReason::NotAdmin));

        admin
            .unblock_slot(&ViewScope::new(), MONDAY, 7)
            .await
            .unwrap();
        assert!(admin.check_availability(MONDAY).await.unwrap().contains(&7));
    }

    #[tokio::test]
    async fn test_settings_update_invalidates_every_date() {
        let store = MemoryStore::builder().owners(["owner"]).build();
        let (_, admin) = client_for(&store, Some("owner"));

        assert_eq!(admin.check_availability(MONDAY).await.unwrap().len(), 16);
        assert_eq!(admin.check_availability(TUESDAY).await.unwrap().len(), 16);

        admin
            .update_slot_settings(&ViewScope::new(), SlotSettings::new(8, 20, 60))
            .await
            .unwrap();

        assert_eq!(admin.check_availability(MONDAY).await.unwrap().len(), 12);
        assert_eq!(admin.check_availability(TUESDAY).await.unwrap().len(), 12);
        assert_eq!(admin.slot_settings().await.unwrap().opening_time, 8);
    }

    #[tokio::test]
    async fn test_unknown_booking() {
        let store = MemoryStore::new();
        let (_, client) = client_for(&store, None);
        assert_eq!(
            client.booking("missing").await,
            Err(ClientError::NotFound { what: "Booking" })
        );
        assert!(matches!(
            client.booking("  ").await,
            Err(ClientError::Validation(_))
        ));
    }
}
